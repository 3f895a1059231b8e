use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{announce_delivery, append_history};
use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{project, project_status_history, project_status_option},
    errors::ServiceError,
    events::Event,
    services::projects::is_terminal_status,
};

#[derive(Debug, Clone)]
pub struct TransitionProjectStatusCommand {
    pub actor: Actor,
    pub project_id: Uuid,
    pub status_id: Uuid,
    pub comments: Option<String>,
    /// Back-dated imports pass the original change time.
    pub changed_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl Command for TransitionProjectStatusCommand {
    type Result = project_status_history::Model;

    fn name(&self) -> &'static str {
        "transition_project_status"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, project = %self.project_id, status = %self.status_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let txn = ctx.db.begin().await?;

        let project = project::Entity::find_by_id(self.project_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", self.project_id))?;
        self.actor.require_project_pm(&project)?;

        if project.current_status_id == self.status_id {
            return Err(ServiceError::InvalidTransition(
                "project is already in the requested status".to_string(),
            ));
        }

        let status = project_status_option::Entity::find_by_id(self.status_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Status", self.status_id))?;
        if !status.is_active {
            return Err(ServiceError::validation("status_id", "status is inactive"));
        }

        let now = ctx.now();
        let changed_at = self.changed_at.unwrap_or(now);

        let mut active: project::ActiveModel = project.into();
        active.current_status_id = Set(status.id);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let history = append_history(
            &txn,
            self.project_id,
            &status,
            self.actor.id,
            changed_at,
            self.comments.clone(),
            now,
        )
        .await?;

        txn.commit().await?;

        info!(status = %status.name, "project status changed");
        ctx.event_sender
            .send_or_log(Event::ProjectStatusChanged {
                project_id: self.project_id,
                status_id: status.id,
            })
            .await;
        if is_terminal_status(&status.name) {
            announce_delivery(ctx, self.project_id, ctx.calendar.local_date(changed_at)).await;
        }

        Ok(history)
    }
}
