//! Dispute control handlers
//!
//! Manual triggers for the same pipeline the poller drives.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use nescrowee_agent::TickReport;
use nescrowee_types::DisputeKey;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub count: usize,
    /// `[contract_id, milestone_id]` pairs
    pub disputes: Vec<DisputeKey>,
}

/// Body of `POST /api/investigate`
#[derive(Debug, Default, Deserialize)]
pub struct InvestigateRequest {
    #[serde(default, alias = "contractId")]
    pub contract_id: Option<String>,
    #[serde(default, alias = "milestoneId")]
    pub milestone_id: Option<String>,
}

impl InvestigateRequest {
    fn into_key(self) -> ApiResult<DisputeKey> {
        let contract_id = required(self.contract_id, "contract_id")?;
        let milestone_id = required(self.milestone_id, "milestone_id")?;
        Ok(DisputeKey::new(contract_id, milestone_id))
    }
}

fn required(value: Option<String>, name: &'static str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ApiError::MissingParameter(name)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvestigateResponse {
    /// Outcome as `resolved: ...`, `no context found`, `already processing`
    /// or `error: ...`
    pub result: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollResponse {
    pub processed: usize,
    /// A tick was already running, so this one did nothing
    pub skipped: bool,
    /// Pending disputes could not be fetched
    pub failed: bool,
}

impl From<TickReport> for PollResponse {
    fn from(report: TickReport) -> Self {
        Self {
            processed: report.processed(),
            skipped: report == TickReport::Skipped,
            failed: report == TickReport::Failed,
        }
    }
}

/// List disputes the escrow contract reports as awaiting resolution
pub async fn pending(State(state): State<Arc<AppState>>) -> ApiResult<Json<PendingResponse>> {
    let disputes = state.coordinator.chain().get_pending_disputes().await?;
    Ok(Json(PendingResponse {
        count: disputes.len(),
        disputes,
    }))
}

/// Run one coordinator cycle for a single dispute
///
/// Pipeline failures are reported in `result` with a 200; only a malformed
/// request is an HTTP error.
pub async fn investigate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<InvestigateRequest>, JsonRejection>,
) -> ApiResult<Json<InvestigateResponse>> {
    let Json(request) = body?;
    let key = request.into_key()?;

    tracing::info!(dispute = %key, "Manual investigation requested");
    let outcome = state.coordinator.process(key).await;

    Ok(Json(InvestigateResponse {
        result: outcome.to_string(),
    }))
}

/// Force one poller tick
pub async fn poll(State(state): State<Arc<AppState>>) -> Json<PollResponse> {
    Json(state.poller.tick().await.into())
}
