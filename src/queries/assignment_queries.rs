use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Query;
use crate::{
    clock::BusinessCalendar,
    entities::{daily_time_total, project, project_task, task_assignment},
    errors::ServiceError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatusFilter {
    All,
    #[default]
    Active,
    Completed,
}

/// Caller-supplied filters of the PM assignment overview.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilters {
    #[serde(default)]
    pub status: AssignmentStatusFilter,
    pub team_member_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub dpm_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOverviewRow {
    #[serde(flatten)]
    pub assignment: task_assignment::Model,
    pub task_id: String,
    pub project_id: Uuid,
    pub hs_id: String,
    pub project_name: String,
    pub worked_minutes: i64,
}

/// Assignments in a date window. The window applies to `completion_date`
/// for completed assignments and to `assigned_date` otherwise.
#[derive(Debug, Clone)]
pub struct AssignmentOverviewQuery {
    pub filters: AssignmentFilters,
    pub today: NaiveDate,
    pub window_days: i64,
    pub calendar: BusinessCalendar,
}

impl AssignmentOverviewQuery {
    /// Inclusive local-date window, defaulting to the last `window_days` days.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        let end = self.filters.end_date.unwrap_or(self.today);
        let start = self
            .filters
            .start_date
            .unwrap_or(self.today - Duration::days(self.window_days));
        (start, end)
    }

    fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, end) = self.window();
        (
            self.calendar.start_of_day(start),
            self.calendar.start_of_day(end + Duration::days(1)),
        )
    }
}

#[async_trait]
impl Query for AssignmentOverviewQuery {
    type Result = Vec<AssignmentOverviewRow>;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let (start, end) = self.window();
        if start > end {
            return Err(ServiceError::validation(
                "start_date",
                "start date is after end date",
            ));
        }
        let (lower, upper) = self.bounds();

        let date_column = match self.filters.status {
            AssignmentStatusFilter::Completed => task_assignment::Column::CompletionDate,
            _ => task_assignment::Column::AssignedDate,
        };

        let mut select = task_assignment::Entity::find()
            .filter(date_column.gte(lower))
            .filter(date_column.lt(upper));
        select = match self.filters.status {
            AssignmentStatusFilter::All => select,
            AssignmentStatusFilter::Active => {
                select.filter(task_assignment::Column::IsCompleted.eq(false))
            }
            AssignmentStatusFilter::Completed => {
                select.filter(task_assignment::Column::IsCompleted.eq(true))
            }
        };
        if let Some(id) = self.filters.team_member_id {
            select = select.filter(task_assignment::Column::AssignedTo.eq(id));
        }

        if self.filters.project_id.is_some() || self.filters.dpm_id.is_some() {
            let mut projects = project::Entity::find().select_only().column(project::Column::Id);
            if let Some(id) = self.filters.project_id {
                projects = projects.filter(project::Column::Id.eq(id));
            }
            if let Some(id) = self.filters.dpm_id {
                projects = projects.filter(project::Column::DpmId.eq(id));
            }
            let project_ids: Vec<Uuid> = projects.into_tuple().all(db_pool).await?;
            let task_ids: Vec<Uuid> = project_task::Entity::find()
                .select_only()
                .column(project_task::Column::Id)
                .filter(project_task::Column::ProjectId.is_in(project_ids))
                .into_tuple()
                .all(db_pool)
                .await?;
            select = select.filter(task_assignment::Column::ProjectTaskId.is_in(task_ids));
        }

        let assignments = select.order_by_desc(date_column).all(db_pool).await?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let assignment_ids: Vec<Uuid> = assignments.iter().map(|a| a.id).collect();
        let worked: HashMap<Uuid, i64> = daily_time_total::Entity::find()
            .select_only()
            .column(daily_time_total::Column::TaskAssignmentId)
            .column_as(Expr::col(daily_time_total::Column::TotalMinutes).sum(), "total")
            .filter(daily_time_total::Column::TaskAssignmentId.is_in(assignment_ids))
            .group_by(daily_time_total::Column::TaskAssignmentId)
            .into_tuple::<(Uuid, Option<i64>)>()
            .all(db_pool)
            .await?
            .into_iter()
            .map(|(id, total)| (id, total.unwrap_or(0)))
            .collect();

        let task_ids: Vec<Uuid> = assignments.iter().map(|a| a.project_task_id).collect();
        let tasks: HashMap<Uuid, project_task::Model> = project_task::Entity::find()
            .filter(project_task::Column::Id.is_in(task_ids))
            .all(db_pool)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let project_ids: Vec<Uuid> = tasks.values().map(|t| t.project_id).collect();
        let projects: HashMap<Uuid, project::Model> = project::Entity::find()
            .filter(project::Column::Id.is_in(project_ids))
            .all(db_pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut rows = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let Some(task) = tasks.get(&assignment.project_task_id) else {
                continue;
            };
            let Some(project) = projects.get(&task.project_id) else {
                continue;
            };
            rows.push(AssignmentOverviewRow {
                worked_minutes: worked.get(&assignment.id).copied().unwrap_or(0),
                task_id: task.task_id.clone(),
                project_id: project.id,
                hs_id: project.hs_id.clone(),
                project_name: project.project_name.clone(),
                assignment,
            });
        }
        Ok(rows)
    }
}
