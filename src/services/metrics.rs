//! Daily per-member metrics.
//!
//! A row in `team_member_metrics` is a pure function of the member's
//! completions, daily totals, roster and deliveries for one local date, so
//! recomputing is always safe and yields the same figures.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    clock::{BusinessCalendar, Clock},
    db::DbPool,
    entities::{
        daily_roster::{self, RosterStatus},
        daily_time_total, project_delivery, task_assignment, team_member_metrics,
        user::{self, UserRole},
    },
    errors::ServiceError,
    events::{Event, EventHandler},
    tracing::with_metrics,
};

const PERCENT_CEILING: Decimal = dec!(999.99);

/// Everything the daily figures are derived from.
#[derive(Debug, Clone, Default)]
pub struct MetricsInputs {
    /// `(projected, worked)` minutes and optional rating of each assignment
    /// completed on the date.
    pub completed: Vec<CompletedWork>,
    /// Roster status and misc minutes, when a roster row exists.
    pub roster: Option<(RosterStatus, i32)>,
    /// Minutes in daily totals dated on the day.
    pub worked_on_day: i64,
    /// `(rating, days_variance)` of each delivery the member was incharge of.
    pub deliveries: Vec<(Option<Decimal>, Option<i32>)>,
    pub available_minutes: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletedWork {
    pub projected_minutes: i64,
    pub worked_minutes: i64,
    pub quality_rating: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMetrics {
    pub total_projected_minutes: i64,
    pub total_worked_minutes: i64,
    pub available_minutes: Option<i32>,
    pub worked_today_minutes: Option<i64>,
    pub utilization_pct: Option<Decimal>,
    pub productivity_score: Option<Decimal>,
    pub average_quality_rating: Option<Decimal>,
    pub average_delivery_rating: Option<Decimal>,
    pub on_time_rate: Option<Decimal>,
    pub assignments_completed: i32,
    pub rated_assignments: i32,
    pub projects_delivered: i32,
    pub on_time_deliveries: i32,
}

/// `100 * numerator / denominator`, or `None` when the denominator is zero.
fn percent(numerator: i64, denominator: i64) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    (Decimal::from(numerator) * dec!(100))
        .checked_div(Decimal::from(denominator))
        .map(|pct| pct.round_dp(2))
}

fn average(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    sum.checked_div(Decimal::from(values.len() as i64))
        .map(|avg| avg.round_dp(2))
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

pub fn compute(inputs: &MetricsInputs) -> DailyMetrics {
    let projected: i64 = inputs.completed.iter().map(|c| c.projected_minutes).sum();
    let worked: i64 = inputs.completed.iter().map(|c| c.worked_minutes).sum();
    let productivity =
        percent(projected, worked).map(|p| p.clamp(Decimal::ZERO, PERCENT_CEILING));

    let (available, worked_today, utilization) = match inputs.roster {
        Some((RosterStatus::Present, misc)) => {
            let worked_today = inputs.worked_on_day + i64::from(misc);
            let utilization = percent(worked_today, i64::from(inputs.available_minutes))
                .map(|u| u.clamp(Decimal::ZERO, PERCENT_CEILING));
            (Some(inputs.available_minutes), Some(worked_today), utilization)
        }
        _ => (None, None, None),
    };

    let quality: Vec<Decimal> = inputs
        .completed
        .iter()
        .filter_map(|c| c.quality_rating)
        .collect();
    let average_quality = average(&quality).map(|q| q.clamp(dec!(1), dec!(5)));

    let delivery_ratings: Vec<Decimal> = inputs
        .deliveries
        .iter()
        .filter_map(|(rating, _)| *rating)
        .filter(|rating| *rating > Decimal::ZERO)
        .collect();
    let delivered = inputs.deliveries.len();
    let on_time = inputs
        .deliveries
        .iter()
        .filter(|(_, variance)| matches!(variance, Some(v) if *v <= 0))
        .count();

    DailyMetrics {
        total_projected_minutes: projected,
        total_worked_minutes: worked,
        available_minutes: available,
        worked_today_minutes: worked_today,
        utilization_pct: utilization,
        productivity_score: productivity,
        average_quality_rating: average_quality,
        average_delivery_rating: average(&delivery_ratings),
        on_time_rate: percent(on_time as i64, delivered as i64),
        assignments_completed: count(inputs.completed.len()),
        rated_assignments: count(quality.len()),
        projects_delivered: count(delivered),
        on_time_deliveries: count(on_time),
    }
}

/// Recomputes and stores `team_member_metrics` rows.
#[derive(Clone)]
pub struct MetricsService {
    db: Arc<DbPool>,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
    available_minutes_per_day: i32,
}

impl MetricsService {
    pub fn new(
        db: Arc<DbPool>,
        clock: Arc<dyn Clock>,
        calendar: BusinessCalendar,
        available_minutes_per_day: i32,
    ) -> Self {
        Self {
            db,
            clock,
            calendar,
            available_minutes_per_day,
        }
    }

    async fn gather<C: ConnectionTrait>(
        &self,
        conn: &C,
        team_member_id: Uuid,
        date: NaiveDate,
    ) -> Result<MetricsInputs, ServiceError> {
        let window_start = self.calendar.start_of_day(date);
        let window_end = self.calendar.start_of_day(date + Duration::days(1));

        let assignments = task_assignment::Entity::find()
            .filter(task_assignment::Column::AssignedTo.eq(team_member_id))
            .filter(task_assignment::Column::IsCompleted.eq(true))
            .filter(task_assignment::Column::CompletionDate.gte(window_start))
            .filter(task_assignment::Column::CompletionDate.lt(window_end))
            .all(conn)
            .await?;

        let mut completed = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let worked: Option<Option<i64>> = daily_time_total::Entity::find()
                .select_only()
                .column_as(Expr::col(daily_time_total::Column::TotalMinutes).sum(), "total")
                .filter(daily_time_total::Column::TaskAssignmentId.eq(assignment.id))
                .filter(daily_time_total::Column::TeamMemberId.eq(team_member_id))
                .into_tuple()
                .one(conn)
                .await?;
            completed.push(CompletedWork {
                projected_minutes: i64::from(assignment.projected_hours),
                worked_minutes: worked.flatten().unwrap_or(0),
                quality_rating: assignment.quality_rating,
            });
        }

        let roster = daily_roster::Entity::find()
            .filter(daily_roster::Column::TeamMemberId.eq(team_member_id))
            .filter(daily_roster::Column::Date.eq(date))
            .one(conn)
            .await?
            .map(|row| (row.status, row.misc_hours));

        let worked_on_day: Option<Option<i64>> = daily_time_total::Entity::find()
            .select_only()
            .column_as(Expr::col(daily_time_total::Column::TotalMinutes).sum(), "total")
            .filter(daily_time_total::Column::TeamMemberId.eq(team_member_id))
            .filter(daily_time_total::Column::DateWorked.eq(date))
            .into_tuple()
            .one(conn)
            .await?;

        let deliveries = project_delivery::Entity::find()
            .filter(project_delivery::Column::ProjectInchargeId.eq(team_member_id))
            .filter(project_delivery::Column::DeliveryDate.eq(date))
            .all(conn)
            .await?
            .into_iter()
            .map(|d| (d.delivery_performance_rating, d.days_variance_snapshot))
            .collect();

        Ok(MetricsInputs {
            completed,
            roster,
            worked_on_day: worked_on_day.flatten().unwrap_or(0),
            deliveries,
            available_minutes: self.available_minutes_per_day,
        })
    }

    /// Recomputes the member's row for `date` and upserts it.
    #[instrument(skip(self), fields(team_member = %team_member_id, %date))]
    pub async fn recompute(
        &self,
        team_member_id: Uuid,
        date: NaiveDate,
    ) -> Result<team_member_metrics::Model, ServiceError> {
        with_metrics("metrics.recompute", || async {
            let db = self.db.as_ref();
            let inputs = self.gather(db, team_member_id, date).await?;
            let figures = compute(&inputs);
            let row = upsert(db, team_member_id, date, &figures, self.clock.now()).await?;
            counter!("worklog.metrics.recomputed", 1);
            debug!(
                completed = figures.assignments_completed,
                delivered = figures.projects_delivered,
                "metrics recomputed"
            );
            Ok::<_, ServiceError>(row)
        })
        .await
    }

    /// Recomputes every day in `[from, to]` for one member, or for every
    /// active user when `team_member_id` is `None`. Returns rows written.
    #[instrument(skip(self))]
    pub async fn backfill(
        &self,
        team_member_id: Option<Uuid>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<usize, ServiceError> {
        if from > to {
            return Err(ServiceError::validation("from", "start date is after end date"));
        }
        let members = match team_member_id {
            Some(id) => vec![id],
            None => user::Entity::find()
                .filter(user::Column::IsActive.eq(true))
                .filter(user::Column::Role.eq(UserRole::TeamMember))
                .all(self.db.as_ref())
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect(),
        };

        let mut written = 0;
        for member in members {
            let mut date = from;
            while date <= to {
                self.recompute(member, date).await?;
                written += 1;
                date += Duration::days(1);
            }
        }
        info!(written, "metrics backfill finished");
        Ok(written)
    }

    pub async fn get(
        &self,
        team_member_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<team_member_metrics::Model>, ServiceError> {
        Ok(team_member_metrics::Entity::find()
            .filter(team_member_metrics::Column::TeamMemberId.eq(team_member_id))
            .filter(team_member_metrics::Column::Date.eq(date))
            .one(self.db.as_ref())
            .await?)
    }
}

fn clamp_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

async fn upsert<C: ConnectionTrait>(
    conn: &C,
    team_member_id: Uuid,
    date: NaiveDate,
    figures: &DailyMetrics,
    now: DateTime<Utc>,
) -> Result<team_member_metrics::Model, ServiceError> {
    use team_member_metrics::Column;

    let row = team_member_metrics::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_member_id: Set(team_member_id),
        date: Set(date),
        total_projected_minutes: Set(clamp_i32(figures.total_projected_minutes)),
        total_worked_minutes: Set(clamp_i32(figures.total_worked_minutes)),
        available_minutes: Set(figures.available_minutes),
        worked_today_minutes: Set(figures.worked_today_minutes.map(clamp_i32)),
        utilization_pct: Set(figures.utilization_pct),
        productivity_score: Set(figures.productivity_score),
        average_quality_rating: Set(figures.average_quality_rating),
        average_delivery_rating: Set(figures.average_delivery_rating),
        on_time_rate: Set(figures.on_time_rate),
        assignments_completed: Set(figures.assignments_completed),
        rated_assignments: Set(figures.rated_assignments),
        projects_delivered: Set(figures.projects_delivered),
        on_time_deliveries: Set(figures.on_time_deliveries),
        computed_at: Set(now),
    };

    team_member_metrics::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([Column::TeamMemberId, Column::Date])
                .update_columns([
                    Column::TotalProjectedMinutes,
                    Column::TotalWorkedMinutes,
                    Column::AvailableMinutes,
                    Column::WorkedTodayMinutes,
                    Column::UtilizationPct,
                    Column::ProductivityScore,
                    Column::AverageQualityRating,
                    Column::AverageDeliveryRating,
                    Column::OnTimeRate,
                    Column::AssignmentsCompleted,
                    Column::RatedAssignments,
                    Column::ProjectsDelivered,
                    Column::OnTimeDeliveries,
                    Column::ComputedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    team_member_metrics::Entity::find()
        .filter(Column::TeamMemberId.eq(team_member_id))
        .filter(Column::Date.eq(date))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InternalError("metrics row missing after upsert".into()))
}

/// Keeps daily metrics current as time and completions are recorded.
pub struct MetricsRefresher {
    metrics: MetricsService,
}

impl MetricsRefresher {
    pub fn new(metrics: MetricsService) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl EventHandler for MetricsRefresher {
    fn name(&self) -> &'static str {
        "metrics_refresher"
    }

    async fn handle_event(&self, event: &Event) -> Result<(), ServiceError> {
        if let Some((team_member_id, date)) = event.metrics_key() {
            self.metrics.recompute(team_member_id, date).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn work(projected: i64, worked: i64, rating: Option<Decimal>) -> CompletedWork {
        CompletedWork {
            projected_minutes: projected,
            worked_minutes: worked,
            quality_rating: rating,
        }
    }

    #[test]
    fn empty_day_has_no_ratios() {
        let figures = compute(&MetricsInputs {
            available_minutes: 480,
            ..Default::default()
        });
        assert_eq!(figures.productivity_score, None);
        assert_eq!(figures.utilization_pct, None);
        assert_eq!(figures.average_quality_rating, None);
        assert_eq!(figures.average_delivery_rating, None);
        assert_eq!(figures.on_time_rate, None);
        assert_eq!(figures.assignments_completed, 0);
    }

    #[test]
    fn productivity_and_quality() {
        let figures = compute(&MetricsInputs {
            completed: vec![work(60, 45, Some(dec!(4))), work(30, 45, None)],
            available_minutes: 480,
            ..Default::default()
        });
        assert_eq!(figures.total_projected_minutes, 90);
        assert_eq!(figures.total_worked_minutes, 90);
        assert_eq!(figures.productivity_score, Some(dec!(100)));
        assert_eq!(figures.average_quality_rating, Some(dec!(4)));
        assert_eq!(figures.rated_assignments, 1);
        assert_eq!(figures.assignments_completed, 2);
    }

    #[test]
    fn productivity_is_clamped() {
        let figures = compute(&MetricsInputs {
            completed: vec![work(100_000, 1, None)],
            available_minutes: 480,
            ..Default::default()
        });
        assert_eq!(figures.productivity_score, Some(dec!(999.99)));
    }

    #[test]
    fn utilization_only_when_present() {
        let present = compute(&MetricsInputs {
            roster: Some((RosterStatus::Present, 30)),
            worked_on_day: 210,
            available_minutes: 480,
            ..Default::default()
        });
        assert_eq!(present.worked_today_minutes, Some(240));
        assert_eq!(present.available_minutes, Some(480));
        assert_eq!(present.utilization_pct, Some(dec!(50)));

        let leave = compute(&MetricsInputs {
            roster: Some((RosterStatus::Leave, 30)),
            worked_on_day: 210,
            available_minutes: 480,
            ..Default::default()
        });
        assert_eq!(leave.utilization_pct, None);
        assert_eq!(leave.worked_today_minutes, None);
    }

    #[test]
    fn deliveries_and_on_time_rate() {
        let figures = compute(&MetricsInputs {
            deliveries: vec![
                (Some(dec!(4.0)), Some(2)),
                (Some(dec!(0)), Some(0)),
                (None, Some(-1)),
                (Some(dec!(3.0)), None),
            ],
            available_minutes: 480,
            ..Default::default()
        });
        assert_eq!(figures.projects_delivered, 4);
        assert_eq!(figures.on_time_deliveries, 2);
        assert_eq!(figures.on_time_rate, Some(dec!(50)));
        assert_eq!(figures.average_delivery_rating, Some(dec!(3.5)));
    }

    #[test]
    fn thirds_round_to_two_places() {
        assert_eq!(percent(1, 3), Some(dec!(33.33)));
        assert_eq!(percent(2, 3), Some(dec!(66.67)));
        assert_eq!(percent(5, 0), None);
    }

    proptest! {
        #[test]
        fn ratios_stay_in_range(
            projected in 0i64..100_000,
            worked in 0i64..100_000,
            misc in 0i32..1440,
            on_day in 0i64..5000,
            rating in 10i64..=50,
        ) {
            let figures = compute(&MetricsInputs {
                completed: vec![work(projected, worked, Some(Decimal::new(rating, 1)))],
                roster: Some((RosterStatus::Present, misc)),
                worked_on_day: on_day,
                available_minutes: 480,
                ..Default::default()
            });
            if let Some(p) = figures.productivity_score {
                prop_assert!(p >= Decimal::ZERO && p <= PERCENT_CEILING);
            }
            let u = figures.utilization_pct.unwrap();
            prop_assert!(u >= Decimal::ZERO && u <= PERCENT_CEILING);
            let q = figures.average_quality_rating.unwrap();
            prop_assert!(q >= dec!(1) && q <= dec!(5));
            prop_assert_eq!(figures.productivity_score.is_none(), worked == 0);
        }
    }
}
