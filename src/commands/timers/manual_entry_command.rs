use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{
        task_assignment,
        time_session::{self, SessionType},
        timer_action_log::TimerAction,
    },
    errors::{Precondition, ServiceError},
    events::Event,
    services::timers::{add_to_daily_total, log_action},
};

#[derive(Debug, Clone, Validate)]
pub struct ManualEntryCommand {
    pub actor: Actor,
    pub assignment_id: Uuid,
    pub date_worked: NaiveDate,
    #[validate(range(min = 0, max = 23, message = "hours must be between 0 and 23"))]
    pub hours: i32,
    #[validate(range(min = 0, max = 59, message = "minutes must be between 0 and 59"))]
    pub minutes: i32,
    #[validate(length(max = 1000, message = "description is too long"))]
    pub description: Option<String>,
}

impl ManualEntryCommand {
    pub fn total_minutes(&self) -> i32 {
        self.hours * 60 + self.minutes
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualEntryResult {
    pub session: time_session::Model,
}

#[async_trait]
impl Command for ManualEntryCommand {
    type Result = ManualEntryResult;

    fn name(&self) -> &'static str {
        "manual_entry"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, assignment = %self.assignment_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let total = self.total_minutes();
        if total < 1 {
            return Err(ServiceError::validation(
                "minutes",
                "total time must be at least one minute",
            ));
        }
        if self.date_worked > ctx.today() {
            return Err(ServiceError::validation(
                "date_worked",
                "cannot record time for a future date",
            ));
        }

        let txn = ctx.db.begin().await?;

        let assignment = task_assignment::Entity::find_by_id(self.assignment_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", self.assignment_id))?;
        self.actor.require_assignee(&assignment)?;
        if assignment.is_completed {
            return Err(ServiceError::precondition(Precondition::AssignmentCompleted));
        }

        let now = ctx.now();
        let started_at = ctx.calendar.start_of_day(self.date_worked);
        let session = time_session::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_assignment_id: Set(assignment.id),
            team_member_id: Set(self.actor.id),
            started_at: Set(started_at),
            ended_at: Set(started_at + Duration::minutes(i64::from(total))),
            duration_minutes: Set(total),
            date_worked: Set(self.date_worked),
            session_type: Set(SessionType::Manual),
            description: Set(self.description.clone().filter(|d| !d.trim().is_empty())),
            is_edited: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        add_to_daily_total(&txn, assignment.id, self.actor.id, self.date_worked, total, now).await?;

        log_action(
            &txn,
            assignment.id,
            self.actor.id,
            TimerAction::ManualAdd,
            now,
            Some(format!("{} minutes on {}", total, self.date_worked)),
        )
        .await?;

        txn.commit().await?;

        info!(minutes = total, date_worked = %self.date_worked, "manual time recorded");
        ctx.event_sender
            .send_or_log(Event::ManualTimeAdded {
                assignment_id: assignment.id,
                team_member_id: self.actor.id,
                session_id: session.id,
                date: self.date_worked,
            })
            .await;

        Ok(ManualEntryResult { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hours: i32, minutes: i32) -> ManualEntryCommand {
        ManualEntryCommand {
            actor: Actor::team_member(Uuid::new_v4()),
            assignment_id: Uuid::new_v4(),
            date_worked: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            hours,
            minutes,
            description: None,
        }
    }

    #[test]
    fn hours_and_minutes_are_bounded() {
        assert!(entry(23, 59).validate().is_ok());
        assert!(entry(24, 0).validate().is_err());
        assert!(entry(0, 60).validate().is_err());
        assert!(entry(-1, 0).validate().is_err());
        assert_eq!(entry(1, 30).total_minutes(), 90);
    }
}
