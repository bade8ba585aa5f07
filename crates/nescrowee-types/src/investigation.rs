//! Output of the investigation engine, before normalization

use serde::{Deserialize, Serialize};

/// Confidence assumed when the model omits one
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// A structured analysis produced by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationResult {
    /// Resolution as the model phrased it; see [`crate::normalize`]
    pub resolution: String,
    pub explanation: String,
    /// 0..=100
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_for_freelancer: Option<String>,
    #[serde(default)]
    pub evidence_reviewed: Vec<String>,
    /// Id of the model response this analysis came from; the attestation
    /// subject
    pub response_id: String,
}
