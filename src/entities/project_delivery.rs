use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot written when a project reaches a terminal status.
/// Unique on `(project_id, delivery_date)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub delivery_date: NaiveDate,
    pub project_name: String,
    pub hs_id: String,
    pub project_incharge_id: Uuid,
    #[sea_orm(nullable)]
    pub expected_completion_date: Option<NaiveDate>,
    pub actual_completion_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((3, 1)))", nullable)]
    pub delivery_performance_rating: Option<Decimal>,
    /// `actual - expected` in days; positive means late.
    #[sea_orm(nullable)]
    pub days_variance_snapshot: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
