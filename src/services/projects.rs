use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::Actor,
    clock::BusinessCalendar,
    commands::{
        projects::{
            create_project_command::{CreateProjectCommand, NewProject},
            import_status_history_command::ImportStatusHistoryCommand,
            transition_project_status_command::TransitionProjectStatusCommand,
            update_project_command::{ProjectChanges, UpdateProjectCommand},
        },
        run, CommandContext,
    },
    entities::{project, project_status_history},
    errors::{FieldErrors, ServiceError},
};

/// Status names that end a project, compared case-insensitively.
pub const TERMINAL_STATUSES: [&str; 3] = ["Final Delivery", "Deemed Consumed", "Opp Dropped"];

pub fn is_terminal_status(name: &str) -> bool {
    let name = name.trim();
    TERMINAL_STATUSES
        .iter()
        .any(|terminal| terminal.eq_ignore_ascii_case(name))
}

/// Pipeline means not delivered, except that an approval-of-deemed-consumption
/// status always counts as pipeline.
pub fn is_pipeline_status(name: &str) -> bool {
    let lower = name.to_lowercase();
    let awaiting_approval = ["approval", "deemed", "consumed"]
        .iter()
        .all(|word| lower.contains(word));
    awaiting_approval || !is_terminal_status(name)
}

/// Collects a message when `rating` is outside `[1, 5]` or finer than 0.1.
pub fn check_rating(errors: &mut FieldErrors, field: &str, rating: Option<Decimal>) {
    if let Some(rating) = rating {
        if rating < dec!(1) || rating > dec!(5) {
            errors.add(field, "rating must be between 1 and 5");
        } else if rating.normalize().scale() > 1 {
            errors.add(field, "rating supports one decimal place");
        }
    }
}

/// Collects a message when the purchase date follows the sales confirmation.
pub fn check_project_dates(
    errors: &mut FieldErrors,
    purchase_date: NaiveDate,
    sales_confirmation_date: NaiveDate,
) {
    if purchase_date > sales_confirmation_date {
        errors.add(
            "purchase_date",
            "purchase date must not be after the sales confirmation date",
        );
    }
}

/// Earliest local date on which the project entered a terminal status.
pub fn delivery_date_from_history(
    history: &[project_status_history::Model],
    calendar: &BusinessCalendar,
) -> Option<NaiveDate> {
    history
        .iter()
        .filter(|row| is_terminal_status(&row.status_name_snapshot))
        .map(|row| row.changed_at)
        .min()
        .map(|changed_at| calendar.local_date(changed_at))
}

pub async fn delivery_date<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    calendar: &BusinessCalendar,
) -> Result<Option<NaiveDate>, ServiceError> {
    let history = project_status_history::Entity::find()
        .filter(project_status_history::Column::ProjectId.eq(project_id))
        .order_by_asc(project_status_history::Column::ChangedAt)
        .all(conn)
        .await?;
    Ok(delivery_date_from_history(&history, calendar))
}

/// Write side of projects and their status history.
#[derive(Clone)]
pub struct ProjectService {
    ctx: Arc<CommandContext>,
}

impl ProjectService {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, project), fields(actor = %actor.id))]
    pub async fn create(
        &self,
        actor: Actor,
        project: NewProject,
        is_bulk_import: bool,
    ) -> Result<project::Model, ServiceError> {
        run(
            &CreateProjectCommand {
                actor,
                project,
                is_bulk_import,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self, comments), fields(actor = %actor.id))]
    pub async fn transition_status(
        &self,
        actor: Actor,
        project_id: Uuid,
        status_id: Uuid,
        comments: Option<String>,
        changed_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<project_status_history::Model, ServiceError> {
        run(
            &TransitionProjectStatusCommand {
                actor,
                project_id,
                status_id,
                comments,
                changed_at,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self, changes), fields(actor = %actor.id))]
    pub async fn update(
        &self,
        actor: Actor,
        project_id: Uuid,
        changes: ProjectChanges,
    ) -> Result<project::Model, ServiceError> {
        run(
            &UpdateProjectCommand {
                actor,
                project_id,
                changes,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self, command), fields(actor = %command.actor.id, project = %command.project_id))]
    pub async fn import_history(
        &self,
        command: ImportStatusHistoryCommand,
    ) -> Result<project_status_history::Model, ServiceError> {
        run(&command, &self.ctx).await
    }

    pub async fn delivery_date(&self, project_id: Uuid) -> Result<Option<NaiveDate>, ServiceError> {
        delivery_date(self.ctx.db.as_ref(), project_id, &self.ctx.calendar).await
    }
}
