use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-member working status for one day. Assignment minutes are not stored
/// here; they are summed from `daily_time_totals` on read.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_rosters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub team_member_id: Uuid,
    pub date: NaiveDate,
    pub status: RosterStatus,
    /// Minutes.
    pub misc_hours: i32,
    #[sea_orm(nullable)]
    pub misc_description: Option<String>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub is_auto_created: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeamMemberId",
        to = "super::user::Column::Id"
    )]
    TeamMember,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RosterStatus {
    #[sea_orm(string_value = "PRESENT")]
    Present,
    #[sea_orm(string_value = "HALF_DAY")]
    HalfDay,
    #[sea_orm(string_value = "LEAVE")]
    Leave,
    #[sea_orm(string_value = "TEAM_OUTING")]
    TeamOuting,
    #[sea_orm(string_value = "WEEK_OFF")]
    WeekOff,
    #[sea_orm(string_value = "HOLIDAY")]
    Holiday,
}
