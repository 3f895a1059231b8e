use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timer_action_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub task_assignment_id: Uuid,
    pub team_member_id: Uuid,
    pub action: TimerAction,
    pub logged_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub details: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerAction {
    #[sea_orm(string_value = "START")]
    Start,
    #[sea_orm(string_value = "STOP")]
    Stop,
    #[sea_orm(string_value = "MANUAL_ADD")]
    ManualAdd,
    #[sea_orm(string_value = "EDIT_SESSION")]
    EditSession,
    #[sea_orm(string_value = "COMPLETE")]
    Complete,
}
