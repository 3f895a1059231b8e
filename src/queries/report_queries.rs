use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use super::{mean, ratio_pct, Query};
use crate::{
    auth::Actor,
    entities::{
        project_delivery, team_member_metrics,
        user::{self, UserRole},
    },
    errors::ServiceError,
};

/// Range aggregates over stored daily metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsAggregate {
    pub days: usize,
    pub assignments_completed: i64,
    pub projects_delivered: i64,
    pub on_time_deliveries: i64,
    pub total_projected_minutes: i64,
    pub total_worked_minutes: i64,
    pub average_productivity: Option<Decimal>,
    pub average_utilization: Option<Decimal>,
    pub average_quality_rating: Option<Decimal>,
    pub average_delivery_rating: Option<Decimal>,
    pub on_time_rate: Option<Decimal>,
}

impl MetricsAggregate {
    /// Averages are taken over days that carry a value.
    pub fn from_rows(rows: &[team_member_metrics::Model]) -> Self {
        let sum = |f: fn(&team_member_metrics::Model) -> i32| -> i64 {
            rows.iter().map(|r| i64::from(f(r))).sum()
        };
        let projects_delivered = sum(|r| r.projects_delivered);
        let on_time_deliveries = sum(|r| r.on_time_deliveries);

        Self {
            days: rows.len(),
            assignments_completed: sum(|r| r.assignments_completed),
            projects_delivered,
            on_time_deliveries,
            total_projected_minutes: sum(|r| r.total_projected_minutes),
            total_worked_minutes: sum(|r| r.total_worked_minutes),
            average_productivity: mean(rows.iter().filter_map(|r| r.productivity_score)),
            average_utilization: mean(rows.iter().filter_map(|r| r.utilization_pct)),
            average_quality_rating: mean(rows.iter().filter_map(|r| r.average_quality_rating)),
            average_delivery_rating: mean(rows.iter().filter_map(|r| r.average_delivery_rating)),
            on_time_rate: ratio_pct(on_time_deliveries, projects_delivered),
        }
    }
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), ServiceError> {
    if from > to {
        return Err(ServiceError::validation("from", "start date is after end date"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberReport {
    pub team_member_id: Uuid,
    pub full_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub daily: Vec<team_member_metrics::Model>,
    pub deliveries: Vec<project_delivery::Model>,
    pub aggregate: MetricsAggregate,
}

/// Daily metric series, delivery history and range aggregates of one member.
#[derive(Debug, Clone)]
pub struct TeamMemberReportQuery {
    pub actor: Actor,
    pub team_member_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[async_trait]
impl Query for TeamMemberReportQuery {
    type Result = TeamMemberReport;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        self.actor.require_self_or_pm(self.team_member_id)?;
        check_range(self.from, self.to)?;

        let member = user::Entity::find_by_id(self.team_member_id)
            .one(db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", self.team_member_id))?;

        let daily = team_member_metrics::Entity::find()
            .filter(team_member_metrics::Column::TeamMemberId.eq(member.id))
            .filter(team_member_metrics::Column::Date.between(self.from, self.to))
            .order_by_asc(team_member_metrics::Column::Date)
            .all(db_pool)
            .await?;
        let deliveries = project_delivery::Entity::find()
            .filter(project_delivery::Column::ProjectInchargeId.eq(member.id))
            .filter(project_delivery::Column::DeliveryDate.between(self.from, self.to))
            .order_by_desc(project_delivery::Column::DeliveryDate)
            .all(db_pool)
            .await?;

        Ok(TeamMemberReport {
            aggregate: MetricsAggregate::from_rows(&daily),
            team_member_id: member.id,
            full_name: member.full_name,
            from: self.from,
            to: self.to,
            daily,
            deliveries,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamOverviewRow {
    pub team_member_id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(flatten)]
    pub aggregate: MetricsAggregate,
}

/// Highest productivity first; members without a score go last.
fn by_productivity(a: &TeamOverviewRow, b: &TeamOverviewRow) -> Ordering {
    match (a.aggregate.average_productivity, b.aggregate.average_productivity) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.full_name.cmp(&b.full_name))
}

/// Per-member averages across the active team. PM only.
#[derive(Debug, Clone)]
pub struct TeamOverviewQuery {
    pub actor: Actor,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[async_trait]
impl Query for TeamOverviewQuery {
    type Result = Vec<TeamOverviewRow>;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        self.actor.require_pm()?;
        check_range(self.from, self.to)?;

        let (members, metric_rows) = futures::try_join!(
            user::Entity::find()
                .filter(user::Column::IsActive.eq(true))
                .filter(user::Column::Role.eq(UserRole::TeamMember))
                .all(db_pool),
            team_member_metrics::Entity::find()
                .filter(team_member_metrics::Column::Date.between(self.from, self.to))
                .all(db_pool),
        )?;

        let mut by_member: HashMap<Uuid, Vec<team_member_metrics::Model>> = HashMap::new();
        for row in metric_rows {
            by_member.entry(row.team_member_id).or_default().push(row);
        }

        let mut rows: Vec<TeamOverviewRow> = members
            .into_iter()
            .map(|m| TeamOverviewRow {
                aggregate: MetricsAggregate::from_rows(
                    by_member.get(&m.id).map(Vec::as_slice).unwrap_or_default(),
                ),
                team_member_id: m.id,
                username: m.username,
                full_name: m.full_name,
            })
            .collect();
        rows.sort_by(by_productivity);
        Ok(rows)
    }
}
