use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

use super::common::{no_content_response, success_response};
use crate::{auth::CurrentActor, errors::ServiceError, handlers::AppState};

/// The calling user.
async fn me(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get(actor.id).await?;
    Ok(success_response(user))
}

async fn get_user(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get(user_id).await?;
    Ok(success_response(user))
}

async fn delete_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.users.delete(actor, user_id).await?;
    info!(%user_id, "user deleted");
    Ok(no_content_response())
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/:id", get(get_user).delete(delete_user))
}
