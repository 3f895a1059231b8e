use std::sync::Arc;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    db::DbPool,
    entities::{
        active_timer, daily_time_total, project, project_delivery, project_status_history,
        project_task, task_assignment, time_session, timer_action_log, user,
    },
    errors::{Precondition, ServiceError},
};

/// Names of the record kinds that still point at `user_id`.
pub async fn user_references<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Vec<&'static str>, ServiceError> {
    let mut found = Vec::new();

    let projects = project::Entity::find()
        .filter(
            Condition::any()
                .add(project::Column::DpmId.eq(user_id))
                .add(project::Column::ProjectInchargeId.eq(user_id)),
        )
        .count(conn)
        .await?;
    if projects > 0 {
        found.push("projects");
    }
    if project_status_history::Entity::find()
        .filter(project_status_history::Column::ChangedBy.eq(user_id))
        .count(conn)
        .await?
        > 0
    {
        found.push("status history");
    }
    if project_task::Entity::find()
        .filter(project_task::Column::CreatedBy.eq(user_id))
        .count(conn)
        .await?
        > 0
    {
        found.push("tasks");
    }
    let assignments = task_assignment::Entity::find()
        .filter(
            Condition::any()
                .add(task_assignment::Column::AssignedTo.eq(user_id))
                .add(task_assignment::Column::AssignedBy.eq(user_id)),
        )
        .count(conn)
        .await?;
    if assignments > 0 {
        found.push("assignments");
    }
    if time_session::Entity::find()
        .filter(time_session::Column::TeamMemberId.eq(user_id))
        .count(conn)
        .await?
        + daily_time_total::Entity::find()
            .filter(daily_time_total::Column::TeamMemberId.eq(user_id))
            .count(conn)
            .await?
        + timer_action_log::Entity::find()
            .filter(timer_action_log::Column::TeamMemberId.eq(user_id))
            .count(conn)
            .await?
        > 0
    {
        found.push("sessions");
    }
    if active_timer::Entity::find()
        .filter(active_timer::Column::TeamMemberId.eq(user_id))
        .count(conn)
        .await?
        > 0
    {
        found.push("timers");
    }
    if project_delivery::Entity::find()
        .filter(project_delivery::Column::ProjectInchargeId.eq(user_id))
        .count(conn)
        .await?
        > 0
    {
        found.push("deliveries");
    }

    Ok(found)
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }

    /// Deletes a user nobody references. Rosters and metrics go with them.
    #[instrument(skip(self), fields(actor = %actor.id, user = %user_id))]
    pub async fn delete(&self, actor: Actor, user_id: Uuid) -> Result<(), ServiceError> {
        actor.require_pm()?;

        let txn = self.db.begin().await?;
        let user = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        let references = user_references(&txn, user_id).await?;
        if !references.is_empty() {
            return Err(ServiceError::precondition(Precondition::ReferencedRecord {
                entity: format!("user {}", user.username),
                references: references.join(", "),
            }));
        }

        user.delete(&txn).await?;
        txn.commit().await?;

        info!("user deleted");
        Ok(())
    }
}
