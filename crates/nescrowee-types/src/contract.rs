//! Read-only views of the escrow contract

use serde::{Deserialize, Deserializer, Serialize};

/// The parts of an escrow contract the investigator reads.
///
/// Fetched fresh for every investigation and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    /// Model the parties agreed to have their disputes judged by
    pub model_id: String,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl ContractSnapshot {
    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// yoctoNEAR; the contract encodes u128 as a decimal string
    #[serde(deserialize_with = "string_or_json")]
    pub amount: String,
    #[serde(deserialize_with = "string_or_json")]
    pub status: String,
}

/// Accept either a JSON string or any other JSON value rendered as text.
fn string_or_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
