use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity supplied by the authentication collaborator.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub full_name: String,
    #[sea_orm(nullable)]
    pub email: Option<String>,
    pub role: UserRole,
    /// Holiday calendar key; matched against `holidays.location`.
    #[sea_orm(nullable)]
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::daily_roster::Entity")]
    DailyRosters,
    #[sea_orm(has_many = "super::team_member_metrics::Entity")]
    Metrics,
}

impl Related<super::daily_roster::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyRosters.def()
    }
}

impl Related<super::team_member_metrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Metrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum UserRole {
    #[sea_orm(string_value = "DPM")]
    #[serde(rename = "DPM")]
    Dpm,
    #[sea_orm(string_value = "TEAM_MEMBER")]
    #[serde(rename = "TEAM_MEMBER")]
    TeamMember,
}
