//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Control routes under `/api`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::status::status))
        .route("/pending", get(handlers::disputes::pending))
        .route("/investigate", post(handlers::disputes::investigate))
        .route("/poll", get(handlers::disputes::poll))
        .route("/health", get(handlers::health::health_check))
}
