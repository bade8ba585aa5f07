//! Nescrowee control surface
//!
//! Small JSON API for operators. It exposes agent status and manual
//! triggers; the poller keeps running regardless of whether anyone calls it.
//!
//! # API Structure
//!
//! ```text
//! /                      - Summary
//! /api/
//! ├── /status            - In-flight and recently completed disputes
//! ├── /pending           - Disputes awaiting resolution on-chain
//! ├── /investigate       - Run one dispute now (POST)
//! ├── /poll              - Force a poll tick
//! └── /health            - Liveness
//! ```
//!
//! There is no authentication: bind it to a private interface.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{ApiError, ApiResult};
pub use state::{AgentInfo, AppState};

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Create the main router with all middleware
pub fn create_router(state: Arc<AppState>, config: ApiConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::status::summary))
        .nest("/api", routes::api_routes())
        .with_state(state);

    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ));
    }

    if config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
