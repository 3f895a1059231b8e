use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::CurrentActor, commands::timers::manual_entry_command::ManualEntryCommand,
    errors::ServiceError, handlers::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StartTimerRequest {
    pub assignment_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct StopTimerRequest {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManualEntryRequest {
    pub assignment_id: Uuid,
    pub date_worked: NaiveDate,
    #[serde(default)]
    pub hours: i32,
    #[serde(default)]
    pub minutes: i32,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditSessionRequest {
    pub duration_minutes: i32,
}

async fn start_timer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<StartTimerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let timer = state
        .services
        .timers
        .start(actor, payload.assignment_id)
        .await?;
    Ok(created_response(timer))
}

async fn stop_timer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    payload: Option<Json<StopTimerRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    let description = payload.and_then(|Json(p)| p.description);
    let stopped = state.services.timers.stop(actor, description).await?;
    Ok(success_response(stopped.session))
}

async fn active_timer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, ServiceError> {
    let timer = state.services.timers.active_timer(actor).await?;
    Ok(success_response(timer))
}

async fn add_manual_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<ManualEntryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .timers
        .add_manual_entry(ManualEntryCommand {
            actor,
            assignment_id: payload.assignment_id,
            date_worked: payload.date_worked,
            hours: payload.hours,
            minutes: payload.minutes,
            description: payload.description,
        })
        .await?;
    Ok(created_response(result.session))
}

async fn edit_session(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<EditSessionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .timers
        .edit_session(actor, session_id, payload.duration_minutes)
        .await?;
    Ok(success_response(result))
}

pub fn timer_routes() -> Router<AppState> {
    Router::new()
        .route("/timers/start", post(start_timer))
        .route("/timers/stop", post(stop_timer))
        .route("/timers/active", get(active_timer))
        .route("/time-entries", post(add_manual_entry))
        .route("/sessions/:id", patch(edit_session))
}
