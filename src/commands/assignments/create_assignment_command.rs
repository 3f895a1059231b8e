use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{
        project, project_task,
        task_assignment::{self, ReworkType},
        user,
    },
    errors::{FieldErrors, ServiceError},
    services::sequences::issue_assignment_id,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAssignment {
    pub project_task_id: Uuid,
    pub assigned_to: Uuid,
    /// Minutes.
    #[validate(range(min = 1, message = "projected time must be greater than zero"))]
    pub projected_hours: i32,
    #[serde(default)]
    #[validate(length(max = 1000, message = "sub task is too long"))]
    pub sub_task: String,
    #[serde(default)]
    pub rework_type: Option<ReworkType>,
    pub expected_delivery_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CreateAssignmentCommand {
    pub actor: Actor,
    pub assignment: NewAssignment,
}

#[async_trait]
impl Command for CreateAssignmentCommand {
    type Result = task_assignment::Model;

    fn name(&self) -> &'static str {
        "create_assignment"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, task = %self.assignment.project_task_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let input = &self.assignment;
        let mut errors = match input.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => err.into(),
        };
        if input.expected_delivery_date <= ctx.today() {
            errors.add(
                "expected_delivery_date",
                "expected delivery date must be in the future",
            );
        }

        let txn = ctx.db.begin().await?;

        let task = project_task::Entity::find_by_id(input.project_task_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task", input.project_task_id))?;
        let project = project::Entity::find_by_id(task.project_id)
            .lock_shared()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", task.project_id))?;
        self.actor.require_project_pm(&project)?;

        match user::Entity::find_by_id(input.assigned_to).one(&txn).await? {
            None => errors.add("assigned_to", "unknown user"),
            Some(u) if !u.is_active => errors.add("assigned_to", "user is inactive"),
            Some(_) => {}
        }
        errors.into_result()?;

        let assignment_id = issue_assignment_id(&txn).await?;
        let now = ctx.now();
        let assignment = task_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            assignment_id: Set(assignment_id),
            project_task_id: Set(task.id),
            assigned_to: Set(input.assigned_to),
            projected_hours: Set(input.projected_hours),
            sub_task: Set(input.sub_task.trim().to_string()),
            rework_type: Set(input.rework_type),
            expected_delivery_date: Set(input.expected_delivery_date),
            is_active: Set(true),
            is_completed: Set(false),
            completion_date: Set(None),
            quality_rating: Set(None),
            assigned_by: Set(self.actor.id),
            assigned_date: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(assignment_id = %assignment.assignment_id, assignee = %assignment.assigned_to, "assignment created");
        Ok(assignment)
    }
}
