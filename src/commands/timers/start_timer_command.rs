use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{active_timer, task_assignment, timer_action_log::TimerAction},
    errors::{Precondition, ServiceError},
    events::Event,
    services::timers::log_action,
};

#[derive(Debug, Clone)]
pub struct StartTimerCommand {
    pub actor: Actor,
    pub assignment_id: Uuid,
}

#[async_trait]
impl Command for StartTimerCommand {
    type Result = active_timer::Model;

    fn name(&self) -> &'static str {
        "start_timer"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, assignment = %self.assignment_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let txn = ctx.db.begin().await?;

        let running = active_timer::Entity::find()
            .filter(active_timer::Column::TeamMemberId.eq(self.actor.id))
            .lock_exclusive()
            .one(&txn)
            .await?;
        if let Some(running) = running {
            let assignment_id = task_assignment::Entity::find_by_id(running.task_assignment_id)
                .one(&txn)
                .await?
                .map(|a| a.assignment_id)
                .unwrap_or_else(|| running.task_assignment_id.to_string());
            return Err(ServiceError::precondition(
                Precondition::AnotherTimerRunning { assignment_id },
            ));
        }

        let assignment = task_assignment::Entity::find_by_id(self.assignment_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", self.assignment_id))?;

        if assignment.is_completed {
            return Err(ServiceError::precondition(Precondition::AssignmentCompleted));
        }
        self.actor.require_assignee(&assignment)?;

        let now = ctx.now();
        let timer = active_timer::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_assignment_id: Set(assignment.id),
            team_member_id: Set(self.actor.id),
            started_at: Set(now),
        }
        .insert(&txn)
        .await?;

        log_action(&txn, assignment.id, self.actor.id, TimerAction::Start, now, None).await?;

        txn.commit().await?;

        info!(assignment_id = %assignment.assignment_id, "timer started");
        ctx.event_sender
            .send_or_log(Event::TimerStarted {
                assignment_id: assignment.id,
                team_member_id: self.actor.id,
            })
            .await;

        Ok(timer)
    }
}
