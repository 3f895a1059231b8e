use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{BinOper, Expr, SimpleExpr},
    ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::daily_roster,
    errors::{FieldErrors, ServiceError},
    events::Event,
    services::roster::get_or_create,
};

const DESCRIPTION_SEPARATOR: &str = "; ";

/// Adds an activity's time to the member's misc hours for a day.
#[derive(Debug, Clone)]
pub struct AppendMiscHoursCommand {
    pub actor: Actor,
    pub team_member_id: Uuid,
    pub date: NaiveDate,
    pub activity: String,
    pub hours: i32,
    pub minutes: i32,
}

impl AppendMiscHoursCommand {
    pub fn total_minutes(&self) -> i32 {
        self.hours * 60 + self.minutes
    }

    /// `"<activity> (HH:MM)"`
    pub fn entry(&self) -> String {
        format!("{} ({:02}:{:02})", self.activity.trim(), self.hours, self.minutes)
    }

    fn check(&self, today: NaiveDate) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        if self.activity.trim().is_empty() {
            errors.add("activity", "activity is required");
        }
        if !(0..=24).contains(&self.hours) {
            errors.add("hours", "hours must be between 0 and 24");
        }
        if !(0..=59).contains(&self.minutes) {
            errors.add("minutes", "minutes must be between 0 and 59");
        }
        if !(1..=1440).contains(&self.total_minutes()) {
            errors.add("minutes", "total time must be between one minute and 24 hours");
        }
        if self.date > today {
            errors.add("date", "cannot record time for a future date");
        }
        errors.into_result()
    }
}

/// `entry` when the description is empty, otherwise `description; entry`.
/// Evaluated by the database so concurrent appends never drop an entry.
fn appended_description(entry: String) -> SimpleExpr {
    let column = || Expr::col(daily_roster::Column::MiscDescription);
    Expr::case(
        column().is_null().or(column().eq("")),
        Expr::val(entry.clone()),
    )
    .finally(
        column()
            .binary(BinOper::Custom("||"), Expr::val(DESCRIPTION_SEPARATOR))
            .binary(BinOper::Custom("||"), Expr::val(entry)),
    )
    .into()
}

#[async_trait]
impl Command for AppendMiscHoursCommand {
    type Result = daily_roster::Model;

    fn name(&self) -> &'static str {
        "append_misc_hours"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, team_member = %self.team_member_id, date = %self.date))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.actor.require_self_or_pm(self.team_member_id)?;
        self.check(ctx.today())?;

        let txn = ctx.db.begin().await?;
        let now = ctx.now();
        let row = get_or_create(&txn, self.team_member_id, self.date, now).await?;

        let entry = self.entry();
        daily_roster::Entity::update_many()
            .col_expr(
                daily_roster::Column::MiscHours,
                Expr::col(daily_roster::Column::MiscHours).add(self.total_minutes()),
            )
            .col_expr(
                daily_roster::Column::MiscDescription,
                appended_description(entry),
            )
            .col_expr(daily_roster::Column::UpdatedAt, Expr::value(now))
            .filter(daily_roster::Column::Id.eq(row.id))
            .exec(&txn)
            .await?;

        let updated = daily_roster::Entity::find_by_id(row.id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Roster", row.id))?;

        txn.commit().await?;

        info!(minutes = self.total_minutes(), "misc hours appended");
        ctx.event_sender
            .send_or_log(Event::MiscHoursAppended {
                team_member_id: self.team_member_id,
                date: self.date,
            })
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn command(activity: &str, hours: i32, minutes: i32) -> AppendMiscHoursCommand {
        AppendMiscHoursCommand {
            actor: Actor::team_member(Uuid::nil()),
            team_member_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            activity: activity.into(),
            hours,
            minutes,
        }
    }

    #[test]
    fn description_append_renders_portably() {
        use sea_orm::{DbBackend, QueryTrait};

        for backend in [DbBackend::Postgres, DbBackend::Sqlite] {
            let sql = daily_roster::Entity::update_many()
                .col_expr(
                    daily_roster::Column::MiscDescription,
                    appended_description("Call (00:15)".into()),
                )
                .filter(daily_roster::Column::Id.eq(Uuid::nil()))
                .build(backend)
                .to_string();
            assert!(sql.contains("CASE WHEN"), "{}", sql);
            assert!(sql.contains("||"), "{}", sql);
            assert!(sql.contains("'; '"), "{}", sql);
            assert!(!sql.contains('?'), "{}", sql);
        }
    }

    #[test]
    fn entry_is_zero_padded() {
        assert_eq!(command(" Meeting ", 0, 30).entry(), "Meeting (00:30)");
        assert_eq!(command("Review", 1, 5).entry(), "Review (01:05)");
    }

    #[test]
    fn bounds_are_enforced() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert!(command("Meeting", 0, 1).check(today).is_ok());
        assert!(command("Meeting", 24, 0).check(today).is_ok());
        assert_matches!(
            command("Meeting", 0, 0).check(today),
            Err(ServiceError::ValidationError(f)) if f.contains("minutes")
        );
        assert_matches!(
            command("Meeting", 24, 1).check(today),
            Err(ServiceError::ValidationError(f)) if f.contains("minutes")
        );
        assert_matches!(
            command("  ", 1, 0).check(today),
            Err(ServiceError::ValidationError(f)) if f.contains("activity")
        );
        let yesterday = today.pred_opt().unwrap();
        assert_matches!(
            command("Meeting", 1, 0).check(yesterday),
            Err(ServiceError::ValidationError(f)) if f.contains("date")
        );
    }
}
