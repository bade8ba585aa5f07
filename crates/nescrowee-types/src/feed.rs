//! Feed transcript types
//!
//! The feed is a public, append-only key-value store. Each escrow contract has
//! a chat namespace that both parties, the UI, and this agent write into. The
//! message `kind` decides how `data` is interpreted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a feed message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// Plain chat between the parties
    Text,
    /// Anonymized dispute summary prepared for the agent
    AiContext,
    /// Per-tool-call transparency record written by the agent
    AiStep,
    /// Evidence upload notice; `data` is an [`EvidenceDescriptor`]
    Evidence,
    /// Final outcome record written by the agent
    AiResolution,
    /// Anything else a client wrote
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::AiContext => "ai_context",
            Self::AiStep => "ai_step",
            Self::Evidence => "evidence",
            Self::AiResolution => "ai_resolution",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "text" => Self::Text,
            "ai_context" => Self::AiContext,
            "ai_step" => Self::AiStep,
            "evidence" => Self::Evidence,
            "ai_resolution" => Self::AiResolution,
            _ => Self::Other(kind),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message from a contract's chat namespace, flattened out of the feed's
/// nested account map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// `"{account}/{message_key}"`
    pub id: String,
    pub sender: String,
    pub content: String,
    /// Unix millis
    pub timestamp: i64,
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl FeedMessage {
    /// Evidence descriptor carried by an `evidence` message, if well formed
    pub fn evidence(&self) -> Option<EvidenceDescriptor> {
        if self.kind != MessageKind::Evidence {
            return None;
        }
        let data = self.data.as_ref()?;
        serde_json::from_value(data.clone()).ok()
    }
}

/// Metadata of an uploaded evidence file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceDescriptor {
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    /// Content id in the evidence vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

/// One step of an investigation, published as an `ai_step` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationStep {
    pub round: u32,
    pub action: String,
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// Outcome record published as an `ai_resolution` message once the
/// resolution is on-chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub analysis: String,
    pub confidence: u8,
    pub model_id: String,
    pub tee_verified: bool,
    pub resolution: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_for_freelancer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence_message(data: serde_json::Value) -> FeedMessage {
        FeedMessage {
            id: "bob.testnet/1700000000000".to_string(),
            sender: "bob.testnet".to_string(),
            content: "uploaded a file".to_string(),
            timestamp: 1_700_000_000_000,
            kind: MessageKind::Evidence,
            data: Some(data),
        }
    }

    #[test]
    fn test_kind_round_trips_unknown_values() {
        assert_eq!(MessageKind::from("ai_context".to_string()), MessageKind::AiContext);
        let custom = MessageKind::from("system_notice".to_string());
        assert_eq!(custom, MessageKind::Other("system_notice".to_string()));
        assert_eq!(custom.to_string(), "system_notice");
    }

    #[test]
    fn test_evidence_descriptor_from_data() {
        let msg = evidence_message(serde_json::json!({
            "fileName": "notes.md",
            "fileType": "text/markdown",
            "fileSize": 812,
            "cid": "bafy123"
        }));
        let evidence = msg.evidence().unwrap();
        assert_eq!(evidence.file_name, "notes.md");
        assert_eq!(evidence.cid.as_deref(), Some("bafy123"));
    }

    #[test]
    fn test_evidence_requires_evidence_kind() {
        let mut msg = evidence_message(serde_json::json!({"fileName": "notes.md"}));
        msg.kind = MessageKind::Text;
        assert!(msg.evidence().is_none());
    }

    #[test]
    fn test_step_omits_empty_observation() {
        let step = InvestigationStep {
            round: 1,
            action: "list_evidence()".to_string(),
            thought: "Calling list_evidence to gather more information".to_string(),
            observation: None,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert!(json.get("observation").is_none());
    }
}
