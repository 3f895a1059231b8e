use async_trait::async_trait;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{
        active_timer,
        time_session::{self, SessionType},
        timer_action_log::TimerAction,
    },
    errors::{Precondition, ServiceError},
    events::Event,
    services::timers::{add_to_daily_total, log_action, session_minutes},
};

#[derive(Debug, Clone)]
pub struct StopTimerCommand {
    pub actor: Actor,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoppedTimer {
    pub session: time_session::Model,
}

impl StoppedTimer {
    pub fn event(&self) -> Event {
        Event::TimerStopped {
            assignment_id: self.session.task_assignment_id,
            team_member_id: self.session.team_member_id,
            session_id: self.session.id,
            date: self.session.date_worked,
        }
    }
}

/// Closes the member's running timer inside `conn`: records the session,
/// adds it to the daily total, logs the stop and deletes the timer.
/// `NoActiveTimer` when nothing is running.
pub async fn stop_running_timer<C: ConnectionTrait>(
    conn: &C,
    ctx: &CommandContext,
    team_member_id: Uuid,
    description: Option<String>,
    details: Option<String>,
) -> Result<StoppedTimer, ServiceError> {
    let timer = active_timer::Entity::find()
        .filter(active_timer::Column::TeamMemberId.eq(team_member_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::precondition(Precondition::NoActiveTimer))?;

    let removed = active_timer::Entity::delete_many()
        .filter(active_timer::Column::Id.eq(timer.id))
        .exec(conn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(ServiceError::precondition(Precondition::NoActiveTimer));
    }

    let now = ctx.now();
    let duration_minutes = session_minutes(timer.started_at, now);
    let date_worked = ctx.calendar.local_date(timer.started_at);

    let session = time_session::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_assignment_id: Set(timer.task_assignment_id),
        team_member_id: Set(team_member_id),
        started_at: Set(timer.started_at),
        ended_at: Set(now),
        duration_minutes: Set(duration_minutes),
        date_worked: Set(date_worked),
        session_type: Set(SessionType::Timer),
        description: Set(description.filter(|d| !d.trim().is_empty())),
        is_edited: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    add_to_daily_total(
        conn,
        timer.task_assignment_id,
        team_member_id,
        date_worked,
        duration_minutes,
        now,
    )
    .await?;

    log_action(
        conn,
        timer.task_assignment_id,
        team_member_id,
        TimerAction::Stop,
        now,
        details.or_else(|| Some(format!("{} minutes", duration_minutes))),
    )
    .await?;

    Ok(StoppedTimer { session })
}

#[async_trait]
impl Command for StopTimerCommand {
    type Result = StoppedTimer;

    fn name(&self) -> &'static str {
        "stop_timer"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let txn = ctx.db.begin().await?;
        let stopped =
            stop_running_timer(&txn, ctx, self.actor.id, self.description.clone(), None).await?;
        txn.commit().await?;

        counter!("worklog.timer.stops", 1);
        info!(
            session_id = %stopped.session.id,
            minutes = stopped.session.duration_minutes,
            date_worked = %stopped.session.date_worked,
            "timer stopped"
        );
        ctx.event_sender.send_or_log(stopped.event()).await;

        Ok(stopped)
    }
}
