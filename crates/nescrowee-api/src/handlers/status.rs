//! Agent status handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use nescrowee_agent::InFlight;
use nescrowee_types::CompletedDispute;

use crate::state::AppState;

/// Completed records returned by `/api/status`
pub const STATUS_HISTORY_LEN: usize = 10;

/// Summary served at `/`
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub agent: String,
    pub network: String,
    pub contract: String,
    pub status: &'static str,
    /// In-flight dispute keys as `contract:milestone`
    pub processing: Vec<String>,
    /// Completed disputes held in history
    pub completed: usize,
}

/// Detailed status served at `/api/status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub agent: String,
    pub network: String,
    pub contract: String,
    pub processing: Vec<String>,
    pub in_flight: Vec<InFlight>,
    /// Most recent completions, oldest first
    pub completed: Vec<CompletedDispute>,
    pub uptime_seconds: u64,
}

fn processing_keys(in_flight: &[InFlight]) -> Vec<String> {
    in_flight.iter().map(|entry| entry.key.to_string()).collect()
}

pub async fn summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let in_flight = state.coordinator.in_flight();
    Json(SummaryResponse {
        agent: state.info.agent.clone(),
        network: state.info.network.clone(),
        contract: state.info.contract.clone(),
        status: "running",
        processing: processing_keys(&in_flight),
        completed: state.coordinator.completed_count(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let in_flight = state.coordinator.in_flight();
    Json(StatusResponse {
        agent: state.info.agent.clone(),
        network: state.info.network.clone(),
        contract: state.info.contract.clone(),
        processing: processing_keys(&in_flight),
        in_flight,
        completed: state.coordinator.recent(STATUS_HISTORY_LEN),
        uptime_seconds: state.uptime_seconds(),
    })
}
