use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
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
    },
    errors::{FieldErrors, ServiceError},
    events::Event,
    services::projects::check_rating,
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AssignmentChanges {
    #[validate(range(min = 1, message = "projected time must be greater than zero"))]
    pub projected_hours: Option<i32>,
    #[validate(length(max = 1000, message = "sub task is too long"))]
    pub sub_task: Option<String>,
    pub rework_type: Option<ReworkType>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub quality_rating: Option<Decimal>,
}

impl AssignmentChanges {
    /// True when anything other than the quality rating is being changed.
    pub fn touches_work_fields(&self) -> bool {
        self.projected_hours.is_some()
            || self.sub_task.is_some()
            || self.rework_type.is_some()
            || self.expected_delivery_date.is_some()
            || self.is_active.is_some()
    }
}

/// PM edit of an assignment. Once completed, only the quality rating moves;
/// before completion the rating cannot be set.
#[derive(Debug, Clone)]
pub struct UpdateAssignmentCommand {
    pub actor: Actor,
    pub assignment_id: Uuid,
    pub changes: AssignmentChanges,
}

#[async_trait]
impl Command for UpdateAssignmentCommand {
    type Result = task_assignment::Model;

    fn name(&self) -> &'static str {
        "update_assignment"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, assignment = %self.assignment_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let changes = &self.changes;
        let mut errors = match changes.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => err.into(),
        };
        check_rating(&mut errors, "quality_rating", changes.quality_rating);

        let txn = ctx.db.begin().await?;

        let assignment = task_assignment::Entity::find_by_id(self.assignment_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", self.assignment_id))?;
        let task = project_task::Entity::find_by_id(assignment.project_task_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task", assignment.project_task_id))?;
        let project = project::Entity::find_by_id(task.project_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", task.project_id))?;
        self.actor.require_project_pm(&project)?;

        if assignment.is_completed {
            if changes.touches_work_fields() {
                errors.add(
                    "assignment",
                    "a completed assignment only accepts a quality rating",
                );
            }
        } else {
            if changes.quality_rating.is_some() {
                errors.add("quality_rating", "only completed assignments can be rated");
            }
            if let Some(date) = changes.expected_delivery_date {
                if date <= ctx.today() {
                    errors.add(
                        "expected_delivery_date",
                        "expected delivery date must be in the future",
                    );
                }
            }
        }
        errors.into_result()?;

        let completed_on = assignment
            .completion_date
            .filter(|_| assignment.is_completed)
            .map(|at| ctx.calendar.local_date(at));

        let mut active: task_assignment::ActiveModel = assignment.into();
        if let Some(v) = changes.projected_hours {
            active.projected_hours = Set(v);
        }
        if let Some(v) = &changes.sub_task {
            active.sub_task = Set(v.trim().to_string());
        }
        if let Some(v) = changes.rework_type {
            active.rework_type = Set(Some(v));
        }
        if let Some(v) = changes.expected_delivery_date {
            active.expected_delivery_date = Set(v);
        }
        if let Some(v) = changes.is_active {
            active.is_active = Set(v);
        }
        if let Some(v) = changes.quality_rating {
            active.quality_rating = Set(Some(v));
        }
        active.updated_at = Set(ctx.now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(assignment_id = %updated.assignment_id, "assignment updated");
        ctx.event_sender
            .send_or_log(Event::AssignmentUpdated {
                assignment_id: updated.id,
                team_member_id: updated.assigned_to,
                completed_on,
            })
            .await;

        Ok(updated)
    }
}
