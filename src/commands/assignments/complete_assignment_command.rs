use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{
        timers::stop_timer_command::{stop_running_timer, StoppedTimer},
        Command, CommandContext,
    },
    entities::{active_timer, task_assignment, timer_action_log::TimerAction},
    errors::{Precondition, ServiceError},
    events::Event,
    services::timers::{log_action, worked_minutes},
};

#[derive(Debug, Clone)]
pub struct CompleteAssignmentCommand {
    pub actor: Actor,
    pub assignment_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedAssignment {
    pub assignment: task_assignment::Model,
    /// Session recorded for a timer that was still running on completion.
    pub stopped: Option<StoppedTimer>,
    pub worked_minutes: i64,
}

#[async_trait]
impl Command for CompleteAssignmentCommand {
    type Result = CompletedAssignment;

    fn name(&self) -> &'static str {
        "complete_assignment"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, assignment = %self.assignment_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let txn = ctx.db.begin().await?;

        let assignment = task_assignment::Entity::find_by_id(self.assignment_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", self.assignment_id))?;
        self.actor.require_assignee(&assignment)?;
        if assignment.is_completed {
            return Err(ServiceError::precondition(Precondition::AlreadyCompleted));
        }

        let running = active_timer::Entity::find()
            .filter(active_timer::Column::TeamMemberId.eq(self.actor.id))
            .filter(active_timer::Column::TaskAssignmentId.eq(assignment.id))
            .lock_exclusive()
            .one(&txn)
            .await?;
        let stopped = match running {
            Some(_) => Some(
                stop_running_timer(
                    &txn,
                    ctx,
                    self.actor.id,
                    None,
                    Some("Completed assignment".to_string()),
                )
                .await?,
            ),
            None => None,
        };

        let worked = worked_minutes(&txn, assignment.id, self.actor.id).await?;
        if worked <= 0 {
            return Err(ServiceError::precondition(Precondition::ZeroHoursWorked));
        }

        let now = ctx.now();
        let mut active: task_assignment::ActiveModel = assignment.into();
        active.is_completed = Set(true);
        active.is_active = Set(false);
        active.completion_date = Set(Some(now));
        active.updated_at = Set(now);
        let completed = active.update(&txn).await?;

        log_action(
            &txn,
            completed.id,
            self.actor.id,
            TimerAction::Complete,
            now,
            Some(format!("{} minutes worked", worked)),
        )
        .await?;

        txn.commit().await?;

        info!(assignment_id = %completed.assignment_id, worked, "assignment completed");
        if let Some(stopped) = &stopped {
            ctx.event_sender.send_or_log(stopped.event()).await;
        }
        ctx.event_sender
            .send_or_log(Event::AssignmentCompleted {
                assignment_id: completed.id,
                team_member_id: self.actor.id,
                date: ctx.calendar.local_date(now),
            })
            .await;

        Ok(CompletedAssignment {
            assignment: completed,
            stopped,
            worked_minutes: worked,
        })
    }
}
