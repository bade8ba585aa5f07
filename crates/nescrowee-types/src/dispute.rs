//! Dispute identity and completion records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one disputable unit of work: a milestone inside an escrow contract.
///
/// Serializes as a `[contract_id, milestone_id]` pair, which is how the escrow
/// contract returns its pending-dispute list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct DisputeKey {
    pub contract_id: String,
    pub milestone_id: String,
}

impl DisputeKey {
    pub fn new(contract_id: impl Into<String>, milestone_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            milestone_id: milestone_id.into(),
        }
    }
}

impl From<(String, String)> for DisputeKey {
    fn from((contract_id, milestone_id): (String, String)) -> Self {
        Self {
            contract_id,
            milestone_id,
        }
    }
}

impl From<DisputeKey> for (String, String) {
    fn from(key: DisputeKey) -> Self {
        (key.contract_id, key.milestone_id)
    }
}

impl fmt::Display for DisputeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contract_id, self.milestone_id)
    }
}

/// A dispute that was resolved and submitted on-chain by this agent.
///
/// Kept as recent history for observability only; the contract is the
/// system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedDispute {
    pub contract_id: String,
    pub milestone_id: String,
    /// Resolution as the model phrased it
    pub resolution: String,
    pub confidence: u8,
    pub timestamp: DateTime<Utc>,
}

impl CompletedDispute {
    pub fn new(key: &DisputeKey, resolution: impl Into<String>, confidence: u8) -> Self {
        Self {
            contract_id: key.contract_id.clone(),
            milestone_id: key.milestone_id.clone(),
            resolution: resolution.into(),
            confidence,
            timestamp: Utc::now(),
        }
    }

    pub fn key(&self) -> DisputeKey {
        DisputeKey::new(&self.contract_id, &self.milestone_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parses_from_contract_pair() {
        let keys: Vec<DisputeKey> =
            serde_json::from_str(r#"[["c1","m1"],["c2","m3"]]"#).unwrap();
        assert_eq!(keys, vec![DisputeKey::new("c1", "m1"), DisputeKey::new("c2", "m3")]);
    }

    #[test]
    fn test_key_serializes_as_pair() {
        let json = serde_json::to_string(&DisputeKey::new("c1", "m1")).unwrap();
        assert_eq!(json, r#"["c1","m1"]"#);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(DisputeKey::new("c1", "m1").to_string(), "c1:m1");
    }
}
