use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{
        run,
        timers::{
            edit_session_command::{EditSessionCommand, EditSessionResult},
            manual_entry_command::{ManualEntryCommand, ManualEntryResult},
            start_timer_command::StartTimerCommand,
            stop_timer_command::{StopTimerCommand, StoppedTimer},
        },
        CommandContext,
    },
    entities::{
        active_timer, daily_time_total,
        time_session::{self, SessionType},
        timer_action_log::{self, TimerAction},
        task_assignment,
    },
    errors::ServiceError,
};

/// Longest session an edit may set, one full day.
pub const MAX_SESSION_MINUTES: i32 = 1440;

/// Billable minutes of a timer run: whole minutes elapsed, never less than one.
pub fn session_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i32 {
    let whole = (ended_at - started_at).num_seconds().div_euclid(60);
    whole.clamp(1, i32::MAX as i64) as i32
}

/// Whole minutes between two instants, floored, zero when reversed.
pub fn elapsed_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    (ended_at - started_at).num_seconds().div_euclid(60).max(0)
}

/// Split of recorded minutes between live timer use and manual additions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerUsage {
    pub timer_minutes: i64,
    pub manual_minutes: i64,
    pub timer_usage_pct: Decimal,
}

/// Attributes each session's minutes to timer or manual use. An edited timer
/// session counts as timer time up to its measured length; any increase
/// beyond that counts as manual.
pub fn timer_usage(sessions: &[time_session::Model]) -> TimerUsage {
    let mut timer = 0i64;
    let mut manual = 0i64;

    for session in sessions {
        let final_minutes = i64::from(session.duration_minutes);
        match session.session_type {
            SessionType::Manual => manual += final_minutes,
            SessionType::Timer if !session.is_edited => timer += final_minutes,
            SessionType::Timer => {
                let original = elapsed_minutes(session.started_at, session.ended_at);
                if final_minutes <= original {
                    timer += final_minutes;
                } else {
                    timer += original;
                    manual += final_minutes - original;
                }
            }
        }
    }

    let total = timer + manual;
    let pct = if total == 0 {
        Decimal::ZERO
    } else {
        (dec!(100) * Decimal::from(timer) / Decimal::from(total)).round_dp(2)
    };

    TimerUsage {
        timer_minutes: timer,
        manual_minutes: manual,
        timer_usage_pct: pct,
    }
}

/// Adds `minutes` to the `(assignment, member, date)` daily total in one
/// statement, creating the row when absent.
pub async fn add_to_daily_total<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
    team_member_id: Uuid,
    date_worked: NaiveDate,
    minutes: i32,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let row = daily_time_total::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_assignment_id: Set(assignment_id),
        team_member_id: Set(team_member_id),
        date_worked: Set(date_worked),
        total_minutes: Set(minutes),
        is_manually_edited: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };

    daily_time_total::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                daily_time_total::Column::TaskAssignmentId,
                daily_time_total::Column::TeamMemberId,
                daily_time_total::Column::DateWorked,
            ])
            .value(
                daily_time_total::Column::TotalMinutes,
                Expr::col((daily_time_total::Entity, daily_time_total::Column::TotalMinutes))
                    .add(Expr::cust("excluded.total_minutes")),
            )
            .value(
                daily_time_total::Column::UpdatedAt,
                Expr::cust("excluded.updated_at"),
            )
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    debug!(%assignment_id, %team_member_id, %date_worked, minutes, "daily total incremented");
    Ok(())
}

/// Rewrites the daily total as the sum of its sessions. Returns the new total.
///
/// The total row is created if missing and locked before the sum is taken, so
/// a stop that already holds the row commits first and its session is counted.
pub async fn resum_daily_total<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
    team_member_id: Uuid,
    date_worked: NaiveDate,
    now: DateTime<Utc>,
) -> Result<i32, ServiceError> {
    let placeholder = daily_time_total::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_assignment_id: Set(assignment_id),
        team_member_id: Set(team_member_id),
        date_worked: Set(date_worked),
        total_minutes: Set(0),
        is_manually_edited: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    daily_time_total::Entity::insert(placeholder)
        .on_conflict(
            OnConflict::columns([
                daily_time_total::Column::TaskAssignmentId,
                daily_time_total::Column::TeamMemberId,
                daily_time_total::Column::DateWorked,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    let row = daily_time_total::Entity::find()
        .filter(daily_time_total::Column::TaskAssignmentId.eq(assignment_id))
        .filter(daily_time_total::Column::TeamMemberId.eq(team_member_id))
        .filter(daily_time_total::Column::DateWorked.eq(date_worked))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InternalError("daily total row vanished".into()))?;

    let sum: Option<Option<i64>> = time_session::Entity::find()
        .select_only()
        .column_as(Expr::col(time_session::Column::DurationMinutes).sum(), "total")
        .filter(time_session::Column::TaskAssignmentId.eq(assignment_id))
        .filter(time_session::Column::TeamMemberId.eq(team_member_id))
        .filter(time_session::Column::DateWorked.eq(date_worked))
        .into_tuple()
        .one(conn)
        .await?;
    let total = i32::try_from(sum.flatten().unwrap_or(0))
        .map_err(|_| ServiceError::InternalError("daily total overflow".into()))?;

    let mut active: daily_time_total::ActiveModel = row.into();
    active.total_minutes = Set(total);
    active.is_manually_edited = Set(false);
    active.updated_at = Set(now);
    active.update(conn).await?;

    Ok(total)
}

/// Total minutes a member has recorded against an assignment, all dates.
pub async fn worked_minutes<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
    team_member_id: Uuid,
) -> Result<i64, ServiceError> {
    let sum: Option<Option<i64>> = daily_time_total::Entity::find()
        .select_only()
        .column_as(Expr::col(daily_time_total::Column::TotalMinutes).sum(), "total")
        .filter(daily_time_total::Column::TaskAssignmentId.eq(assignment_id))
        .filter(daily_time_total::Column::TeamMemberId.eq(team_member_id))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(sum.flatten().unwrap_or(0))
}

pub async fn log_action<C: ConnectionTrait>(
    conn: &C,
    assignment_id: Uuid,
    team_member_id: Uuid,
    action: TimerAction,
    now: DateTime<Utc>,
    details: Option<String>,
) -> Result<(), ServiceError> {
    timer_action_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_assignment_id: Set(assignment_id),
        team_member_id: Set(team_member_id),
        action: Set(action),
        logged_at: Set(now),
        details: Set(details),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// The caller's running timer with its assignment and elapsed minutes.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTimerView {
    pub timer: active_timer::Model,
    pub assignment_id: String,
    pub elapsed_minutes: i64,
}

/// Entry point for the timer engine used by handlers and tests.
#[derive(Clone)]
pub struct TimerService {
    ctx: Arc<CommandContext>,
}

impl TimerService {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn start(
        &self,
        actor: Actor,
        assignment_id: Uuid,
    ) -> Result<active_timer::Model, ServiceError> {
        run(
            &StartTimerCommand {
                actor,
                assignment_id,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn stop(
        &self,
        actor: Actor,
        description: Option<String>,
    ) -> Result<StoppedTimer, ServiceError> {
        run(&StopTimerCommand { actor, description }, &self.ctx).await
    }

    #[instrument(skip(self, command), fields(actor = %command.actor.id))]
    pub async fn add_manual_entry(
        &self,
        command: ManualEntryCommand,
    ) -> Result<ManualEntryResult, ServiceError> {
        run(&command, &self.ctx).await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn edit_session(
        &self,
        actor: Actor,
        session_id: Uuid,
        new_duration_minutes: i32,
    ) -> Result<EditSessionResult, ServiceError> {
        run(
            &EditSessionCommand {
                actor,
                session_id,
                new_duration_minutes,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn active_timer(&self, actor: Actor) -> Result<Option<ActiveTimerView>, ServiceError> {
        let db = self.ctx.db.as_ref();
        let Some(timer) = active_timer::Entity::find()
            .filter(active_timer::Column::TeamMemberId.eq(actor.id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        let assignment = task_assignment::Entity::find_by_id(timer.task_assignment_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", timer.task_assignment_id))?;

        Ok(Some(ActiveTimerView {
            elapsed_minutes: elapsed_minutes(timer.started_at, self.ctx.now()),
            assignment_id: assignment.assignment_id,
            timer,
        }))
    }

    /// Sessions of one member on one assignment, oldest first.
    pub async fn sessions(
        &self,
        assignment_id: Uuid,
        team_member_id: Uuid,
    ) -> Result<Vec<time_session::Model>, ServiceError> {
        Ok(time_session::Entity::find()
            .filter(time_session::Column::TaskAssignmentId.eq(assignment_id))
            .filter(time_session::Column::TeamMemberId.eq(team_member_id))
            .order_by_asc(time_session::Column::StartedAt)
            .all(self.ctx.db.as_ref())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, h, m, s).unwrap()
    }

    fn session(kind: SessionType, measured: i64, final_minutes: i32, edited: bool) -> time_session::Model {
        let started_at = at(9, 0, 0);
        time_session::Model {
            id: Uuid::new_v4(),
            task_assignment_id: Uuid::new_v4(),
            team_member_id: Uuid::new_v4(),
            started_at,
            ended_at: started_at + Duration::minutes(measured),
            duration_minutes: final_minutes,
            date_worked: started_at.date_naive(),
            session_type: kind,
            description: None,
            is_edited: edited,
            created_at: started_at,
            updated_at: started_at,
        }
    }

    #[test]
    fn sub_minute_sessions_count_one_minute() {
        assert_eq!(session_minutes(at(9, 0, 0), at(9, 0, 5)), 1);
        assert_eq!(session_minutes(at(9, 0, 0), at(9, 0, 0)), 1);
        assert_eq!(session_minutes(at(9, 0, 0), at(9, 1, 59)), 1);
        assert_eq!(session_minutes(at(9, 0, 0), at(9, 30, 0)), 30);
        assert_eq!(session_minutes(at(9, 0, 0), at(8, 0, 0)), 1);
    }

    #[test]
    fn usage_splits_edited_increases_into_manual() {
        let sessions = vec![
            session(SessionType::Timer, 30, 30, false),
            session(SessionType::Manual, 15, 15, false),
            session(SessionType::Timer, 20, 10, true),
            session(SessionType::Timer, 10, 25, true),
        ];
        let usage = timer_usage(&sessions);
        assert_eq!(usage.timer_minutes, 30 + 10 + 10);
        assert_eq!(usage.manual_minutes, 15 + 15);
        assert_eq!(usage.timer_usage_pct, dec!(62.50));
    }

    #[test]
    fn usage_of_nothing_is_zero() {
        assert_eq!(timer_usage(&[]).timer_usage_pct, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn session_minutes_is_at_least_one_and_floors(secs in 0i64..200_000) {
            let start = at(0, 0, 0);
            let minutes = session_minutes(start, start + Duration::seconds(secs));
            prop_assert!(minutes >= 1);
            prop_assert_eq!(i64::from(minutes), (secs / 60).max(1));
        }

        #[test]
        fn usage_accounts_for_every_minute(
            measured in 0i64..600,
            final_minutes in 1i32..1440,
            edited in any::<bool>(),
        ) {
            let s = session(SessionType::Timer, measured, final_minutes, edited);
            let usage = timer_usage(std::slice::from_ref(&s));
            prop_assert_eq!(usage.timer_minutes + usage.manual_minutes, i64::from(final_minutes));
            prop_assert!(usage.timer_usage_pct >= Decimal::ZERO);
            prop_assert!(usage.timer_usage_pct <= dec!(100));
        }
    }
}
