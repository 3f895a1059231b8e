use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::CurrentActor,
    commands::{
        projects::{
            create_project_command::NewProject,
            import_status_history_command::ImportStatusHistoryCommand,
            update_project_command::ProjectChanges,
        },
        tasks::create_project_task_command::NewProjectTask,
    },
    errors::ServiceError,
    handlers::AppState,
    queries::{
        project_queries::{
            GetProjectQuery, ListProjectsQuery, ProjectHistoryQuery, ProjectTasksQuery,
        },
        Query as _,
    },
};

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status_id: Uuid,
    pub comments: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ImportHistoryRequest {
    pub status_id: Uuid,
    pub changed_at: DateTime<Utc>,
    pub comments: Option<String>,
    #[serde(default)]
    pub set_current: bool,
}

async fn list_projects(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Query(mut query): Query<ListProjectsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    query.per_page = Some(state.config.page_size(query.per_page));
    let page = query.execute(state.db.as_ref()).await?;
    Ok(success_response(page))
}

async fn create_project(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<NewProject>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.services.projects.create(actor, payload, false).await?;
    info!(hs_id = %project.hs_id, "project created");
    Ok(created_response(project))
}

/// Bulk importer entry point: no "Project Created" history row is written.
async fn import_project(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<NewProject>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.services.projects.create(actor, payload, true).await?;
    Ok(created_response(project))
}

async fn get_project(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = GetProjectQuery {
        project_id,
        calendar: state.ctx.calendar,
    }
    .execute(state.db.as_ref())
    .await?;
    Ok(success_response(detail))
}

async fn update_project(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_id): Path<Uuid>,
    Json(changes): Json<ProjectChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state
        .services
        .projects
        .update(actor, project_id, changes)
        .await?;
    Ok(success_response(project))
}

async fn transition_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let history = state
        .services
        .projects
        .transition_status(
            actor,
            project_id,
            payload.status_id,
            payload.comments,
            payload.changed_at,
        )
        .await?;
    Ok(created_response(history))
}

async fn project_history(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = ProjectHistoryQuery { project_id }
        .execute(state.db.as_ref())
        .await?;
    Ok(success_response(rows))
}

async fn import_history(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<ImportHistoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let row = state
        .services
        .projects
        .import_history(ImportStatusHistoryCommand {
            actor,
            project_id,
            status_id: payload.status_id,
            changed_at: payload.changed_at,
            comments: payload.comments,
            set_current: payload.set_current,
        })
        .await?;
    Ok(created_response(row))
}

async fn project_tasks(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let tasks = ProjectTasksQuery { project_id }
        .execute(state.db.as_ref())
        .await?;
    Ok(success_response(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<NewProjectTask>,
) -> Result<impl IntoResponse, ServiceError> {
    let task = state
        .services
        .assignments
        .create_task(actor, project_id, payload)
        .await?;
    Ok(created_response(task))
}

/// Creates the router for project endpoints
pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/import", post(import_project))
        .route("/:id", get(get_project).patch(update_project))
        .route("/:id/status", post(transition_status))
        .route("/:id/history", get(project_history).post(import_history))
        .route("/:id/tasks", get(project_tasks).post(create_task))
}
