use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, Func},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Page, Query};
use crate::{
    clock::BusinessCalendar,
    entities::{
        city, product, project, project_status_history, project_status_option, project_task,
        task_assignment,
    },
    errors::ServiceError,
    services::projects::{delivery_date_from_history, is_pipeline_status, is_terminal_status},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Pipeline,
    Delivered,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectListItem {
    #[serde(flatten)]
    pub project: project::Model,
    pub status_name: String,
    pub is_delivered: bool,
    pub is_pipeline: bool,
}

fn list_item(
    project: project::Model,
    statuses: &HashMap<Uuid, project_status_option::Model>,
) -> ProjectListItem {
    let status_name = statuses
        .get(&project.current_status_id)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    ProjectListItem {
        is_delivered: is_terminal_status(&status_name),
        is_pipeline: is_pipeline_status(&status_name),
        status_name,
        project,
    }
}

/// Project listing with free-text search and filters, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub search: Option<String>,
    pub status_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub dpm_id: Option<Uuid>,
    pub project_type: Option<ProjectType>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[async_trait]
impl Query for ListProjectsQuery {
    type Result = Page<ProjectListItem>;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let statuses: HashMap<Uuid, project_status_option::Model> =
            project_status_option::Entity::find()
                .all(db_pool)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect();

        let mut select = project::Entity::find();

        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(project::Column::ProjectName))).like(&pattern))
                    .add(Expr::expr(Func::lower(Expr::col(project::Column::OpportunityId))).like(&pattern))
                    .add(Expr::expr(Func::lower(Expr::col(project::Column::BuilderName))).like(&pattern)),
            );
        }
        if let Some(id) = self.status_id {
            select = select.filter(project::Column::CurrentStatusId.eq(id));
        }
        if let Some(id) = self.product_id {
            select = select.filter(project::Column::ProductId.eq(id));
        }
        if let Some(id) = self.city_id {
            select = select.filter(project::Column::CityId.eq(id));
        }
        if let Some(id) = self.dpm_id {
            select = select.filter(project::Column::DpmId.eq(id));
        }
        if let Some(region_id) = self.region_id {
            let city_ids: Vec<Uuid> = city::Entity::find()
                .select_only()
                .column(city::Column::Id)
                .filter(city::Column::RegionId.eq(region_id))
                .into_tuple()
                .all(db_pool)
                .await?;
            select = select.filter(project::Column::CityId.is_in(city_ids));
        }
        if let Some(project_type) = self.project_type {
            let terminal: Vec<Uuid> = statuses
                .values()
                .filter(|s| is_terminal_status(&s.name))
                .map(|s| s.id)
                .collect();
            select = match project_type {
                ProjectType::Delivered => select.filter(project::Column::CurrentStatusId.is_in(terminal)),
                ProjectType::Pipeline => {
                    select.filter(project::Column::CurrentStatusId.is_not_in(terminal))
                }
            };
        }

        let per_page = self.per_page.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = self.page.unwrap_or(1).max(1);
        let paginator = select
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::HsId)
            .paginate(db_pool, per_page);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(|p| list_item(p, &statuses))
            .collect();

        Ok(Page {
            items,
            page,
            per_page,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: project::Model,
    pub status: project_status_option::Model,
    pub city: Option<city::Model>,
    pub product: Option<product::Model>,
    pub is_delivered: bool,
    pub is_pipeline: bool,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct GetProjectQuery {
    pub project_id: Uuid,
    pub calendar: BusinessCalendar,
}

#[async_trait]
impl Query for GetProjectQuery {
    type Result = ProjectDetail;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let project = project::Entity::find_by_id(self.project_id)
            .one(db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", self.project_id))?;
        let status = project_status_option::Entity::find_by_id(project.current_status_id)
            .one(db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Status", project.current_status_id))?;
        let city = city::Entity::find_by_id(project.city_id).one(db_pool).await?;
        let product = product::Entity::find_by_id(project.product_id).one(db_pool).await?;
        let history = project_status_history::Entity::find()
            .filter(project_status_history::Column::ProjectId.eq(project.id))
            .all(db_pool)
            .await?;

        Ok(ProjectDetail {
            is_delivered: is_terminal_status(&status.name),
            is_pipeline: is_pipeline_status(&status.name),
            delivery_date: delivery_date_from_history(&history, &self.calendar),
            project,
            status,
            city,
            product,
        })
    }
}

/// Status history, newest first.
#[derive(Debug, Clone)]
pub struct ProjectHistoryQuery {
    pub project_id: Uuid,
}

#[async_trait]
impl Query for ProjectHistoryQuery {
    type Result = Vec<project_status_history::Model>;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        if project::Entity::find_by_id(self.project_id)
            .one(db_pool)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Project", self.project_id));
        }
        Ok(project_status_history::Entity::find()
            .filter(project_status_history::Column::ProjectId.eq(self.project_id))
            .order_by_desc(project_status_history::Column::ChangedAt)
            .order_by_desc(project_status_history::Column::CreatedAt)
            .all(db_pool)
            .await?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskWithAssignments {
    pub task: project_task::Model,
    pub assignments: Vec<task_assignment::Model>,
}

#[derive(Debug, Clone)]
pub struct ProjectTasksQuery {
    pub project_id: Uuid,
}

#[async_trait]
impl Query for ProjectTasksQuery {
    type Result = Vec<TaskWithAssignments>;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let tasks = project_task::Entity::find()
            .filter(project_task::Column::ProjectId.eq(self.project_id))
            .order_by_asc(project_task::Column::TaskId)
            .find_with_related(task_assignment::Entity)
            .all(db_pool)
            .await?;
        Ok(tasks
            .into_iter()
            .map(|(task, mut assignments)| {
                assignments.sort_by(|a, b| a.assignment_id.cmp(&b.assignment_id));
                TaskWithAssignments { task, assignments }
            })
            .collect())
    }
}
