use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::common::{success_response, DateParam};
use crate::{
    auth::CurrentActor,
    commands::roster::{
        append_misc_hours_command::AppendMiscHoursCommand,
        update_roster_status_command::RosterUpdate,
    },
    errors::ServiceError,
    handlers::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RosterStatusRequest {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub update: RosterUpdate,
}

#[derive(Debug, Deserialize)]
pub struct MiscHoursRequest {
    pub date: NaiveDate,
    pub activity: String,
    #[serde(default)]
    pub hours: i32,
    #[serde(default)]
    pub minutes: i32,
}

#[derive(Debug, Deserialize)]
pub struct MonthParams {
    pub year: i32,
    pub month: u32,
}

async fn roster_day(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_member_id): Path<Uuid>,
    Query(params): Query<DateParam>,
) -> Result<impl IntoResponse, ServiceError> {
    let day = state
        .services
        .roster
        .day(actor, team_member_id, params.date)
        .await?;
    Ok(success_response(day))
}

async fn roster_week(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_member_id): Path<Uuid>,
    Query(params): Query<DateParam>,
) -> Result<impl IntoResponse, ServiceError> {
    let week = state
        .services
        .roster
        .week(actor, team_member_id, params.date)
        .await?;
    Ok(success_response(week))
}

async fn roster_month(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_member_id): Path<Uuid>,
    Query(params): Query<MonthParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let month = state
        .services
        .roster
        .month(actor, team_member_id, params.year, params.month)
        .await?;
    Ok(success_response(month))
}

async fn update_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_member_id): Path<Uuid>,
    Json(payload): Json<RosterStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let row = state
        .services
        .roster
        .update_status(actor, team_member_id, payload.date, payload.update)
        .await?;
    Ok(success_response(row))
}

async fn append_misc_hours(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_member_id): Path<Uuid>,
    Json(payload): Json<MiscHoursRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let row = state
        .services
        .roster
        .append_misc_hours(AppendMiscHoursCommand {
            actor,
            team_member_id,
            date: payload.date,
            activity: payload.activity,
            hours: payload.hours,
            minutes: payload.minutes,
        })
        .await?;
    Ok(success_response(row))
}

pub fn roster_routes() -> Router<AppState> {
    Router::new()
        .route("/:team_member_id/day", get(roster_day))
        .route("/:team_member_id/week", get(roster_week))
        .route("/:team_member_id/month", get(roster_month))
        .route("/:team_member_id/status", put(update_status))
        .route("/:team_member_id/misc-hours", post(append_misc_hours))
}
