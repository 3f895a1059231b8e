use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-assignment, per-member, per-day rollup of session minutes.
/// Unique on `(task_assignment_id, team_member_id, date_worked)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_time_totals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub task_assignment_id: Uuid,
    pub team_member_id: Uuid,
    pub date_worked: NaiveDate,
    pub total_minutes: i32,
    pub is_manually_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::task_assignment::Entity",
        from = "Column::TaskAssignmentId",
        to = "super::task_assignment::Column::Id"
    )]
    Assignment,
}

impl Related<super::task_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
