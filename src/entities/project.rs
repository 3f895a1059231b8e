use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human id such as `A1`, `B17`.
    #[sea_orm(unique)]
    pub hs_id: String,
    pub opportunity_id: String,
    pub project_name: String,
    pub builder_name: String,
    pub city_id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(nullable)]
    pub product_subcategory_id: Option<Uuid>,
    pub quantity: i32,
    pub purchase_date: NaiveDate,
    pub sales_confirmation_date: NaiveDate,
    pub expected_tat_days: i32,
    pub account_manager: String,
    pub dpm_id: Uuid,
    pub current_status_id: Uuid,
    #[sea_orm(nullable)]
    pub project_incharge_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub expected_completion_date: Option<NaiveDate>,
    #[sea_orm(column_type = "Decimal(Some((3, 1)))", nullable)]
    pub delivery_performance_rating: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project_status_option::Entity",
        from = "Column::CurrentStatusId",
        to = "super::project_status_option::Column::Id"
    )]
    CurrentStatus,
    #[sea_orm(
        belongs_to = "super::city::Entity",
        from = "Column::CityId",
        to = "super::city::Column::Id"
    )]
    City,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::project_status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_many = "super::project_task::Entity")]
    Tasks,
    #[sea_orm(has_many = "super::project_delivery::Entity")]
    Deliveries,
}

impl Related<super::project_status_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CurrentStatus.def()
    }
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::City.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::project_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::project_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::project_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
