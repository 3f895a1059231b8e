use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{project, task_assignment, user},
    errors::ServiceError,
};

/// Header carrying the authenticated user's id, set by the upstream
/// authentication collaborator.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "DPM")]
    Dpm,
    #[serde(rename = "TEAM_MEMBER")]
    TeamMember,
}

impl From<user::UserRole> for Role {
    fn from(role: user::UserRole) -> Self {
        match role {
            user::UserRole::Dpm => Role::Dpm,
            user::UserRole::TeamMember => Role::TeamMember,
        }
    }
}

/// The caller of a command: who they are and what they may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn pm(id: Uuid) -> Self {
        Self::new(id, Role::Dpm)
    }

    pub fn team_member(id: Uuid) -> Self {
        Self::new(id, Role::TeamMember)
    }

    pub fn is_pm(&self) -> bool {
        self.role == Role::Dpm
    }

    /// True when the actor is the PM responsible for `project`.
    pub fn is_project_pm(&self, project: &project::Model) -> bool {
        self.is_pm() && project.dpm_id == self.id
    }

    pub fn is_assignee(&self, assignment: &task_assignment::Model) -> bool {
        assignment.assigned_to == self.id
    }

    pub fn require_pm(&self) -> Result<(), ServiceError> {
        if self.is_pm() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("project manager role required".into()))
        }
    }

    pub fn require_project_pm(&self, project: &project::Model) -> Result<(), ServiceError> {
        if self.is_project_pm(project) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "only the project's PM may modify project {}",
                project.hs_id
            )))
        }
    }

    /// A team member may act on their own records; PMs on anyone's.
    pub fn require_self_or_pm(&self, team_member_id: Uuid) -> Result<(), ServiceError> {
        if self.id == team_member_id || self.is_pm() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "team members may only manage their own records".into(),
            ))
        }
    }

    pub fn require_assignee(&self, assignment: &task_assignment::Model) -> Result<(), ServiceError> {
        if self.is_assignee(assignment) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "assignment {} belongs to another team member",
                assignment.assignment_id
            )))
        }
    }
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self::new(user.id, user.role.into())
    }
}

/// Extracts the calling [`Actor`] from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing X-User-Id header".into()))?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| ServiceError::Unauthorized("malformed X-User-Id header".into()))?;

        let db = Arc::<DbPool>::from_ref(state);
        let user = user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                debug!(%user_id, "rejecting unknown or inactive user");
                ServiceError::Unauthorized("unknown or inactive user".into())
            })?;

        Ok(CurrentActor(Actor::from(&user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn project_for(dpm: Uuid) -> project::Model {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        project::Model {
            id: Uuid::new_v4(),
            hs_id: "A1".into(),
            opportunity_id: "OPP-1".into(),
            project_name: "Tower".into(),
            builder_name: "Builder".into(),
            city_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_subcategory_id: None,
            quantity: 1,
            purchase_date: today,
            sales_confirmation_date: today,
            expected_tat_days: 7,
            account_manager: "AM".into(),
            dpm_id: dpm,
            current_status_id: Uuid::new_v4(),
            project_incharge_id: None,
            expected_completion_date: None,
            delivery_performance_rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn project_pm_requires_role_and_ownership() {
        let pm = Actor::pm(Uuid::new_v4());
        let other_pm = Actor::pm(Uuid::new_v4());
        let tm_with_same_id = Actor::team_member(pm.id);
        let project = project_for(pm.id);

        assert!(pm.is_project_pm(&project));
        assert!(!other_pm.is_project_pm(&project));
        assert!(!tm_with_same_id.is_project_pm(&project));
        assert!(matches!(
            other_pm.require_project_pm(&project),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn role_follows_user_role() {
        assert_eq!(Role::from(user::UserRole::Dpm), Role::Dpm);
        assert_eq!(Role::from(user::UserRole::TeamMember), Role::TeamMember);
        assert!(Actor::team_member(Uuid::new_v4()).require_pm().is_err());
    }

    #[test]
    fn members_manage_only_their_own_records() {
        let tm = Actor::team_member(Uuid::new_v4());
        assert!(tm.require_self_or_pm(tm.id).is_ok());
        assert!(tm.require_self_or_pm(Uuid::new_v4()).is_err());
        assert!(Actor::pm(Uuid::new_v4()).require_self_or_pm(tm.id).is_ok());
    }
}
