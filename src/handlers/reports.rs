use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::common::{success_response, DateRange};
use crate::{
    auth::CurrentActor,
    errors::ServiceError,
    handlers::AppState,
    queries::{
        report_queries::{TeamMemberReportQuery, TeamOverviewQuery},
        Query as _,
    },
};

#[derive(Debug, Deserialize)]
pub struct RecomputeRequest {
    pub team_member_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    pub team_member_id: Option<Uuid>,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

async fn team_member_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_member_id): Path<Uuid>,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = TeamMemberReportQuery {
        actor,
        team_member_id,
        from: range.from,
        to: range.to,
    }
    .execute(state.db.as_ref())
    .await?;
    Ok(success_response(report))
}

async fn team_overview(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = TeamOverviewQuery {
        actor,
        from: range.from,
        to: range.to,
    }
    .execute(state.db.as_ref())
    .await?;
    Ok(success_response(rows))
}

async fn recompute_metrics(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<RecomputeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require_pm()?;
    let row = state
        .services
        .metrics
        .recompute(payload.team_member_id, payload.date)
        .await?;
    Ok(success_response(row))
}

async fn backfill_metrics(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<BackfillRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require_pm()?;
    let span = (payload.to - payload.from).num_days() + 1;
    if span > state.config.max_backfill_days {
        return Err(ServiceError::validation(
            "to",
            format!(
                "backfill covers at most {} days per request; use worklog-cli for longer ranges",
                state.config.max_backfill_days
            ),
        ));
    }
    let written = state
        .services
        .metrics
        .backfill(payload.team_member_id, payload.from, payload.to)
        .await?;
    Ok(success_response(json!({ "rows_written": written })))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/team", get(team_overview))
        .route("/reports/team-members/:id", get(team_member_report))
        .route("/metrics/recompute", post(recompute_metrics))
        .route("/metrics/backfill", post(backfill_metrics))
}
