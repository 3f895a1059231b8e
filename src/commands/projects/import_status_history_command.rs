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

/// Appends an explicit, possibly back-dated history row for a bulk-imported
/// project. The current status only moves when `set_current` is true.
#[derive(Debug, Clone)]
pub struct ImportStatusHistoryCommand {
    pub actor: Actor,
    pub project_id: Uuid,
    pub status_id: Uuid,
    pub changed_at: DateTime<Utc>,
    pub comments: Option<String>,
    pub set_current: bool,
}

#[async_trait]
impl Command for ImportStatusHistoryCommand {
    type Result = project_status_history::Model;

    fn name(&self) -> &'static str {
        "import_status_history"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, project = %self.project_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.actor.require_pm()?;
        if self.changed_at > ctx.now() {
            return Err(ServiceError::validation(
                "changed_at",
                "history cannot be recorded in the future",
            ));
        }

        let txn = ctx.db.begin().await?;

        let project = project::Entity::find_by_id(self.project_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", self.project_id))?;
        let status = project_status_option::Entity::find_by_id(self.status_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Status", self.status_id))?;

        let now = ctx.now();
        let moves_current = self.set_current && project.current_status_id != status.id;
        if moves_current {
            if !status.is_active {
                return Err(ServiceError::validation("status_id", "status is inactive"));
            }
            let mut active: project::ActiveModel = project.into();
            active.current_status_id = Set(status.id);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        let history = append_history(
            &txn,
            self.project_id,
            &status,
            self.actor.id,
            self.changed_at,
            self.comments.clone(),
            now,
        )
        .await?;

        txn.commit().await?;

        info!(status = %status.name, changed_at = %self.changed_at, "status history imported");
        if moves_current {
            ctx.event_sender
                .send_or_log(Event::ProjectStatusChanged {
                    project_id: self.project_id,
                    status_id: status.id,
                })
                .await;
        }
        if is_terminal_status(&status.name) {
            announce_delivery(ctx, self.project_id, ctx.calendar.local_date(self.changed_at)).await;
        }

        Ok(history)
    }
}
