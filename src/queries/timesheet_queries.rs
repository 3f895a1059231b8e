use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use super::{ratio_pct, Query};
use crate::{
    auth::Actor,
    entities::{daily_time_total, task_assignment, time_session},
    errors::ServiceError,
    services::timers::{timer_usage, TimerUsage},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimesheetSummary {
    pub worked_minutes: i64,
    pub projected_minutes: i64,
    pub progress_pct: Option<Decimal>,
    pub days_worked: usize,
    /// Days until the expected delivery date; open assignments only.
    pub days_remaining: Option<i64>,
    /// `100 * projected / worked`; completed assignments only.
    pub task_productivity: Option<Decimal>,
    pub quality_rating: Option<Decimal>,
    #[serde(flatten)]
    pub usage: TimerUsage,
}

impl TimesheetSummary {
    pub fn build(
        assignment: &task_assignment::Model,
        totals: &[daily_time_total::Model],
        sessions: &[time_session::Model],
        today: NaiveDate,
    ) -> Self {
        let worked: i64 = totals.iter().map(|t| i64::from(t.total_minutes)).sum();
        let projected = i64::from(assignment.projected_hours);
        let days_worked = totals.iter().filter(|t| t.total_minutes > 0).count();

        let (days_remaining, task_productivity, quality_rating) = if assignment.is_completed {
            (None, ratio_pct(projected, worked), assignment.quality_rating)
        } else {
            (
                Some((assignment.expected_delivery_date - today).num_days()),
                None,
                None,
            )
        };

        Self {
            worked_minutes: worked,
            projected_minutes: projected,
            progress_pct: ratio_pct(worked, projected),
            days_worked,
            days_remaining,
            task_productivity,
            quality_rating,
            usage: timer_usage(sessions),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Timesheet {
    pub assignment: task_assignment::Model,
    pub daily_totals: Vec<daily_time_total::Model>,
    pub sessions: Vec<time_session::Model>,
    pub summary: TimesheetSummary,
}

/// Full time record of one assignment, visible to its assignee and to PMs.
#[derive(Debug, Clone)]
pub struct TimesheetQuery {
    pub actor: Actor,
    pub assignment_id: Uuid,
    pub today: NaiveDate,
}

#[async_trait]
impl Query for TimesheetQuery {
    type Result = Timesheet;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let assignment = task_assignment::Entity::find_by_id(self.assignment_id)
            .one(db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Assignment", self.assignment_id))?;
        if !self.actor.is_pm() {
            self.actor.require_assignee(&assignment)?;
        }

        let daily_totals = daily_time_total::Entity::find()
            .filter(daily_time_total::Column::TaskAssignmentId.eq(assignment.id))
            .order_by_asc(daily_time_total::Column::DateWorked)
            .all(db_pool)
            .await?;
        let sessions = time_session::Entity::find()
            .filter(time_session::Column::TaskAssignmentId.eq(assignment.id))
            .order_by_asc(time_session::Column::StartedAt)
            .all(db_pool)
            .await?;

        let summary = TimesheetSummary::build(&assignment, &daily_totals, &sessions, self.today);
        Ok(Timesheet {
            assignment,
            daily_totals,
            sessions,
            summary,
        })
    }
}
