pub mod assignments;
pub mod common;
pub mod health;
pub mod projects;
pub mod reports;
pub mod roster;
pub mod timers;
pub mod users;

use axum::Router;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Every JSON endpoint, mounted by the caller under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", projects::project_routes())
        .nest("/assignments", assignments::assignment_routes())
        .merge(timers::timer_routes())
        .nest("/roster", roster::roster_routes())
        .merge(reports::report_routes())
        .nest("/users", users::user_routes())
}
