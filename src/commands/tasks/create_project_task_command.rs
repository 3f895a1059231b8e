use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{
        product_task, project,
        project_task::{self, TaskType},
    },
    errors::{Precondition, ServiceError},
    events::Event,
    services::sequences::issue_task_id,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewProjectTask {
    pub product_task_id: Uuid,
    pub task_type: TaskType,
    /// Minutes.
    pub estimated_time: i32,
}

/// Adds a task to a project that already has an incharge and an expected
/// completion date.
#[derive(Debug, Clone)]
pub struct CreateProjectTaskCommand {
    pub actor: Actor,
    pub project_id: Uuid,
    pub task: NewProjectTask,
}

#[async_trait]
impl Command for CreateProjectTaskCommand {
    type Result = project_task::Model;

    fn name(&self) -> &'static str {
        "create_project_task"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, project = %self.project_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        if self.task.estimated_time <= 0 {
            return Err(ServiceError::validation(
                "estimated_time",
                "estimated time must be greater than zero",
            ));
        }

        let txn = ctx.db.begin().await?;

        let project = project::Entity::find_by_id(self.project_id)
            .lock_shared()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", self.project_id))?;
        self.actor.require_project_pm(&project)?;

        if project.project_incharge_id.is_none() || project.expected_completion_date.is_none() {
            return Err(ServiceError::precondition(
                Precondition::MissingProjectConfiguration,
            ));
        }

        let product_task = product_task::Entity::find_by_id(self.task.product_task_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::validation("product_task_id", "unknown product task"))?;
        if product_task.product_id != project.product_id {
            return Err(ServiceError::validation(
                "product_task_id",
                "task does not belong to the project's product",
            ));
        }

        let task_id = issue_task_id(&txn).await?;
        let task = project_task::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_id: Set(task_id),
            project_id: Set(project.id),
            product_task_id: Set(product_task.id),
            task_type: Set(self.task.task_type),
            estimated_time: Set(self.task.estimated_time),
            created_by: Set(self.actor.id),
            created_at: Set(ctx.now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(task_id = %task.task_id, "project task created");
        ctx.event_sender
            .send_or_log(Event::TaskCreated {
                project_id: project.id,
                task_id: task.id,
            })
            .await;

        Ok(task)
    }
}
