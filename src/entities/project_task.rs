use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human id, `TID_00001`.
    #[sea_orm(unique)]
    pub task_id: String,
    pub project_id: Uuid,
    pub product_task_id: Uuid,
    pub task_type: TaskType,
    /// Minutes.
    pub estimated_time: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::product_task::Entity",
        from = "Column::ProductTaskId",
        to = "super::product_task::Column::Id"
    )]
    ProductTask,
    #[sea_orm(has_many = "super::task_assignment::Entity")]
    Assignments,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::product_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductTask.def()
    }
}

impl Related<super::task_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[sea_orm(string_value = "NEW")]
    New,
    #[sea_orm(string_value = "REWORK")]
    Rework,
}
