use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::CurrentActor,
    commands::assignments::{
        create_assignment_command::NewAssignment, update_assignment_command::AssignmentChanges,
    },
    errors::ServiceError,
    handlers::AppState,
    queries::{
        assignment_queries::{AssignmentFilters, AssignmentOverviewQuery},
        timesheet_queries::TimesheetQuery,
        Query as _,
    },
};

/// PM overview of assignments inside the configured window.
async fn list_assignments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filters): Query<AssignmentFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require_pm()?;
    let rows = AssignmentOverviewQuery {
        filters,
        today: state.ctx.today(),
        window_days: state.config.assignment_window_days,
        calendar: state.ctx.calendar,
    }
    .execute(state.db.as_ref())
    .await?;
    Ok(success_response(rows))
}

async fn create_assignment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<NewAssignment>,
) -> Result<impl IntoResponse, ServiceError> {
    let assignment = state.services.assignments.create(actor, payload).await?;
    Ok(created_response(assignment))
}

async fn update_assignment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assignment_id): Path<Uuid>,
    Json(changes): Json<AssignmentChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    let assignment = state
        .services
        .assignments
        .update(actor, assignment_id, changes)
        .await?;
    Ok(success_response(assignment))
}

async fn complete_assignment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let completed = state
        .services
        .assignments
        .complete(actor, assignment_id)
        .await?;
    Ok(success_response(completed))
}

async fn timesheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let sheet = TimesheetQuery {
        actor,
        assignment_id,
        today: state.ctx.today(),
    }
    .execute(state.db.as_ref())
    .await?;
    Ok(success_response(sheet))
}

pub fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route("/:id", patch(update_assignment))
        .route("/:id/complete", post(complete_assignment))
        .route("/:id/timesheet", get(timesheet))
}
