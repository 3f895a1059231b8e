use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

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
    services::timers::{log_action, resum_daily_total, MAX_SESSION_MINUTES},
};

#[derive(Debug, Clone)]
pub struct EditSessionCommand {
    pub actor: Actor,
    pub session_id: Uuid,
    pub new_duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditSessionResult {
    pub session: time_session::Model,
    pub previous_duration_minutes: i32,
    pub daily_total_minutes: i32,
}

#[async_trait]
impl Command for EditSessionCommand {
    type Result = EditSessionResult;

    fn name(&self) -> &'static str {
        "edit_session"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, session = %self.session_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        if !(1..=MAX_SESSION_MINUTES).contains(&self.new_duration_minutes) {
            return Err(ServiceError::validation(
                "new_duration_minutes",
                format!("duration must be between 1 and {} minutes", MAX_SESSION_MINUTES),
            ));
        }

        let txn = ctx.db.begin().await?;

        let session = time_session::Entity::find_by_id(self.session_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Session", self.session_id))?;

        if session.team_member_id != self.actor.id {
            return Err(ServiceError::Forbidden(
                "only the session owner may edit it".into(),
            ));
        }
        if session.session_type != SessionType::Timer {
            return Err(ServiceError::validation(
                "session_id",
                "only timer sessions can be edited",
            ));
        }

        let assignment = task_assignment::Entity::find_by_id(session.task_assignment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", session.task_assignment_id))?;
        if assignment.is_completed {
            return Err(ServiceError::precondition(Precondition::AssignmentCompleted));
        }

        let now = ctx.now();
        let previous = session.duration_minutes;
        let mut active: time_session::ActiveModel = session.into();
        active.duration_minutes = Set(self.new_duration_minutes);
        active.is_edited = Set(true);
        active.updated_at = Set(now);
        let session = active.update(&txn).await?;

        let daily_total = resum_daily_total(
            &txn,
            session.task_assignment_id,
            session.team_member_id,
            session.date_worked,
            now,
        )
        .await?;

        log_action(
            &txn,
            session.task_assignment_id,
            session.team_member_id,
            TimerAction::EditSession,
            now,
            Some(format!(
                "session {}: {} -> {} minutes",
                session.id, previous, self.new_duration_minutes
            )),
        )
        .await?;

        txn.commit().await?;

        info!(previous, updated = self.new_duration_minutes, daily_total, "session edited");
        ctx.event_sender
            .send_or_log(Event::SessionEdited {
                assignment_id: session.task_assignment_id,
                team_member_id: session.team_member_id,
                session_id: session.id,
                date: session.date_worked,
            })
            .await;

        Ok(EditSessionResult {
            session,
            previous_duration_minutes: previous,
            daily_total_minutes: daily_total,
        })
    }
}
