//! Worklog API Library
//!
//! Project status tracking, task assignments, timers and daily rosters, with
//! the per-member metrics derived from them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod queries;
pub mod services;
pub mod tracing;

use std::{sync::Arc, time::Duration};

use axum::{extract::FromRef, http::HeaderValue, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::{
    clock::Clock,
    commands::CommandContext,
    config::{AppConfig, DeliveryTracking},
    db::DbPool,
    events::{EventHandler, EventSender},
    services::{
        factory::{ServiceContainer, ServiceFactory},
        metrics::MetricsRefresher,
    },
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub ctx: Arc<CommandContext>,
    pub services: ServiceContainer,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let ctx = Arc::new(CommandContext::new(db.clone(), event_sender, clock, &config));
        let services = ServiceContainer::new(&ServiceFactory::new(ctx.clone()));
        Self {
            db,
            config: Arc::new(config),
            ctx,
            services,
        }
    }
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

/// Handlers for the background event loop. Delivery tracking joins them
/// only when it is not run inline by the commands.
pub fn event_handlers(ctx: &CommandContext) -> Vec<Arc<dyn EventHandler>> {
    let mut handlers: Vec<Arc<dyn EventHandler>> =
        vec![Arc::new(MetricsRefresher::new(ctx.metrics()))];
    if ctx.delivery_tracking == DeliveryTracking::Deferred {
        handlers.push(Arc::new(ctx.delivery_tracker()));
    }
    handlers
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Full HTTP application: health probes plus `/api/v1`, wrapped in the
/// request-id, tracing, CORS, timeout and compression layers.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api/v1", handlers::api_v1_routes())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::auth::{Actor, Role};
    pub use crate::clock::{BusinessCalendar, Clock, ManualClock, SystemClock};
    pub use crate::errors::{FieldErrors, Precondition, ServiceError};
    pub use crate::events::{Event, EventSender};
    pub use crate::queries::Query;
    pub use crate::{build_router, AppState};
}
