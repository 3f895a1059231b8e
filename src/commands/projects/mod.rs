use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use tracing::error;
use uuid::Uuid;
use validator::ValidationError;

use crate::{
    commands::CommandContext,
    config::DeliveryTracking,
    entities::{
        project_status_history, project_status_option,
        user::{self, UserRole},
    },
    errors::{FieldErrors, ServiceError},
    events::Event,
};

pub mod create_project_command;
pub mod import_status_history_command;
pub mod transition_project_status_command;
pub mod update_project_command;

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Loads a status option, collecting a field error when it is unknown or,
/// if `require_active`, retired.
pub(crate) async fn check_status<C: ConnectionTrait>(
    conn: &C,
    status_id: Uuid,
    require_active: bool,
    errors: &mut FieldErrors,
) -> Result<Option<project_status_option::Model>, ServiceError> {
    let status = project_status_option::Entity::find_by_id(status_id)
        .one(conn)
        .await?;
    match &status {
        None => errors.add("status_id", "unknown status"),
        Some(s) if require_active && !s.is_active => errors.add("status_id", "status is inactive"),
        Some(_) => {}
    }
    Ok(status)
}

/// The project incharge must be an active team member.
pub(crate) async fn check_incharge<C: ConnectionTrait>(
    conn: &C,
    incharge_id: Uuid,
    errors: &mut FieldErrors,
) -> Result<(), ServiceError> {
    match user::Entity::find_by_id(incharge_id).one(conn).await? {
        None => errors.add("project_incharge_id", "unknown user"),
        Some(u) if !u.is_active => errors.add("project_incharge_id", "user is inactive"),
        Some(u) if u.role != UserRole::TeamMember => {
            errors.add("project_incharge_id", "project incharge must be a team member")
        }
        Some(_) => {}
    }
    Ok(())
}

/// Appends a history row with the status categories copied at write time.
pub(crate) async fn append_history<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    status: &project_status_option::Model,
    changed_by: Uuid,
    changed_at: DateTime<Utc>,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<project_status_history::Model, ServiceError> {
    let row = project_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        status_id: Set(status.id),
        status_name_snapshot: Set(status.name.clone()),
        category_one_snapshot: Set(status.category_one.clone()),
        category_two_snapshot: Set(status.category_two.clone()),
        changed_by: Set(changed_by),
        changed_at: Set(changed_at),
        comments: Set(comments),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(row)
}

/// Publishes `ProjectDelivered`. With inline tracking the delivery record is
/// written before this returns; tracking failures are logged.
pub(crate) async fn announce_delivery(ctx: &CommandContext, project_id: Uuid, delivery_date: NaiveDate) {
    ctx.event_sender
        .send_or_log(Event::ProjectDelivered {
            project_id,
            delivery_date,
        })
        .await;

    if ctx.delivery_tracking == DeliveryTracking::Inline {
        if let Err(err) = ctx.delivery_tracker().track(project_id, delivery_date).await {
            error!(%project_id, %delivery_date, error = %err, "delivery tracking failed");
        }
    }
}
