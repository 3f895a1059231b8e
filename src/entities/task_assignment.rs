use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work on a project task, owned by one assignee.
///
/// `projected_hours` holds minutes. Once `is_completed` is set only
/// `quality_rating` may change.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human id, `ASID_000001`.
    #[sea_orm(unique)]
    pub assignment_id: String,
    pub project_task_id: Uuid,
    pub assigned_to: Uuid,
    pub projected_hours: i32,
    pub sub_task: String,
    #[sea_orm(nullable)]
    pub rework_type: Option<ReworkType>,
    pub expected_delivery_date: NaiveDate,
    pub is_active: bool,
    pub is_completed: bool,
    #[sea_orm(nullable)]
    pub completion_date: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Decimal(Some((3, 1)))", nullable)]
    pub quality_rating: Option<Decimal>,
    pub assigned_by: Uuid,
    pub assigned_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project_task::Entity",
        from = "Column::ProjectTaskId",
        to = "super::project_task::Column::Id"
    )]
    ProjectTask,
    #[sea_orm(has_many = "super::time_session::Entity")]
    Sessions,
    #[sea_orm(has_many = "super::daily_time_total::Entity")]
    DailyTotals,
}

impl Related<super::project_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectTask.def()
    }
}

impl Related<super::time_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::daily_time_total::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyTotals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReworkType {
    #[sea_orm(string_value = "NEW")]
    New,
    #[sea_orm(string_value = "INTERNAL_REWORK")]
    InternalRework,
}
