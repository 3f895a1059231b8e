use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{
        assignments::{
            complete_assignment_command::{CompleteAssignmentCommand, CompletedAssignment},
            create_assignment_command::{CreateAssignmentCommand, NewAssignment},
            update_assignment_command::{AssignmentChanges, UpdateAssignmentCommand},
        },
        run,
        tasks::create_project_task_command::{CreateProjectTaskCommand, NewProjectTask},
        CommandContext,
    },
    entities::{project_task, task_assignment},
    errors::ServiceError,
};

/// Project tasks and the assignments hanging off them.
#[derive(Clone)]
pub struct AssignmentService {
    ctx: Arc<CommandContext>,
}

impl AssignmentService {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, task), fields(actor = %actor.id))]
    pub async fn create_task(
        &self,
        actor: Actor,
        project_id: Uuid,
        task: NewProjectTask,
    ) -> Result<project_task::Model, ServiceError> {
        run(
            &CreateProjectTaskCommand {
                actor,
                project_id,
                task,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self, assignment), fields(actor = %actor.id))]
    pub async fn create(
        &self,
        actor: Actor,
        assignment: NewAssignment,
    ) -> Result<task_assignment::Model, ServiceError> {
        run(&CreateAssignmentCommand { actor, assignment }, &self.ctx).await
    }

    #[instrument(skip(self, changes), fields(actor = %actor.id))]
    pub async fn update(
        &self,
        actor: Actor,
        assignment_id: Uuid,
        changes: AssignmentChanges,
    ) -> Result<task_assignment::Model, ServiceError> {
        run(
            &UpdateAssignmentCommand {
                actor,
                assignment_id,
                changes,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn complete(
        &self,
        actor: Actor,
        assignment_id: Uuid,
    ) -> Result<CompletedAssignment, ServiceError> {
        run(
            &CompleteAssignmentCommand {
                actor,
                assignment_id,
            },
            &self.ctx,
        )
        .await
    }
}
