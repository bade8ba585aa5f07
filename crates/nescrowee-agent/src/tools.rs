//! Investigation tools
//!
//! The model can call four read-only tools. Every result is plain text that
//! goes straight back into the transcript, including failures: a tool never
//! aborts the investigation.

use std::sync::Arc;

use nescrowee_chain::{EscrowChain, MessageFeed};
use nescrowee_llm::{ToolCall, ToolSpec};
use nescrowee_types::{EvidenceDescriptor, FeedMessage};
use nescrowee_vault::EvidenceVault;
use serde_json::{json, Value};

/// Longest evidence excerpt handed to the model, in characters
pub const MAX_EVIDENCE_CHARS: usize = 5000;

/// File extensions whose content is shown as text
const TEXT_EXTENSIONS: [&str; 5] = ["txt", "md", "csv", "json", "log"];

/// The tool specs offered to the model
pub fn definitions() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "read_chat".to_string(),
            description: "Read the anonymized chat history between contract parties. Returns messages in chronological order.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "offset": {"type": "number", "description": "Skip this many messages (for pagination). Default 0."}
                }
            }),
        },
        ToolSpec {
            name: "read_evidence".to_string(),
            description: "Read a specific evidence file from the encrypted evidence vault by its file name.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "fileName": {"type": "string", "description": "The name of the evidence file to read."}
                },
                "required": ["fileName"]
            }),
        },
        ToolSpec {
            name: "get_milestone".to_string(),
            description: "Get milestone requirements, description, amount, and current status.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "milestoneId": {"type": "string", "description": "The milestone ID (e.g. 'm1')."}
                },
                "required": ["milestoneId"]
            }),
        },
        ToolSpec {
            name: "list_evidence".to_string(),
            description: "List all available evidence files with their metadata (name, type, size, uploader).".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        },
    ]
}

/// Arguments as the model sent them
struct ToolArgs {
    raw: String,
    parsed: Option<Value>,
}

impl ToolArgs {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            parsed: serde_json::from_str(raw).ok(),
        }
    }

    /// A string argument; unparseable arguments are taken verbatim
    fn string(&self, name: &str) -> String {
        match &self.parsed {
            Some(value) => value
                .get(name)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default(),
            None => self.raw.clone(),
        }
    }

    fn offset(&self) -> usize {
        let Some(value) = self.parsed.as_ref().and_then(|v| v.get("offset")) else {
            return 0;
        };
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
                .unwrap_or(0) as usize,
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

fn is_text_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Render decrypted bytes for the model, capped at [`MAX_EVIDENCE_CHARS`]
pub fn render_evidence_text(file_name: &str, bytes: &[u8]) -> String {
    let content = String::from_utf8_lossy(bytes);
    if content.chars().count() > MAX_EVIDENCE_CHARS {
        let excerpt: String = content.chars().take(MAX_EVIDENCE_CHARS).collect();
        format!(
            "Evidence file \"{}\" (truncated to {} chars):\n{}\n... [truncated]",
            file_name, MAX_EVIDENCE_CHARS, excerpt
        )
    } else {
        format!("Evidence file \"{}\":\n{}", file_name, content)
    }
}

/// Dispatches model tool calls against the chain, the feed, and the vault
pub struct ToolExecutor {
    chain: Arc<dyn EscrowChain>,
    feed: Arc<dyn MessageFeed>,
    vault: Option<Arc<dyn EvidenceVault>>,
}

impl ToolExecutor {
    pub fn new(
        chain: Arc<dyn EscrowChain>,
        feed: Arc<dyn MessageFeed>,
        vault: Option<Arc<dyn EvidenceVault>>,
    ) -> Self {
        Self { chain, feed, vault }
    }

    /// Run one tool call and return its text result
    pub async fn execute(&self, contract_id: &str, call: &ToolCall) -> String {
        let args = ToolArgs::new(&call.arguments);
        let result = match call.name.as_str() {
            "read_chat" => self.read_chat(contract_id, args.offset()).await,
            "read_evidence" => self.read_evidence(contract_id, &args.string("fileName")).await,
            "get_milestone" => self.get_milestone(contract_id, &args.string("milestoneId")).await,
            "list_evidence" => self.list_evidence(contract_id).await,
            other => return format!("Unknown tool: {}", other),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(tool = %call.name, error = %e, "Tool failed");
            format!("Tool {} failed: {}", call.name, e)
        })
    }

    async fn read_chat(&self, contract_id: &str, offset: usize) -> nescrowee_chain::Result<String> {
        let messages = self.feed.read_chat(contract_id, offset).await?;
        if messages.is_empty() {
            return Ok("No messages found.".to_string());
        }
        Ok(messages
            .iter()
            .map(|m| format!("[{}] ({}): {}", m.sender, m.kind, m.content))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn evidence(&self, contract_id: &str) -> nescrowee_chain::Result<Vec<(FeedMessage, EvidenceDescriptor)>> {
        let messages = self.feed.evidence_messages(contract_id).await?;
        Ok(messages
            .into_iter()
            .filter_map(|m| m.evidence().map(|e| (m, e)))
            .collect())
    }

    async fn read_evidence(&self, contract_id: &str, file_name: &str) -> nescrowee_chain::Result<String> {
        let wanted = file_name.trim();
        let evidence = self.evidence(contract_id).await?;
        let Some((_, descriptor)) = evidence.into_iter().find(|(_, e)| e.file_name == wanted) else {
            return Ok(format!("Evidence file \"{}\" not found.", file_name));
        };

        let Some(cid) = descriptor.cid.as_deref() else {
            return Ok(format!(
                "Evidence file \"{}\" has no CID — cannot retrieve content.",
                file_name
            ));
        };

        if !is_text_file(&descriptor.file_name) {
            return Ok(format!(
                "Evidence file \"{}\" is a binary file ({}). Cannot display text content — noted as evidence.",
                descriptor.file_name, descriptor.file_type
            ));
        }

        let Some(vault) = &self.vault else {
            return Ok(format!(
                "Evidence file \"{}\" ({}, {} bytes, CID: {}). NOVA API key not configured — cannot decrypt.",
                descriptor.file_name, descriptor.file_type, descriptor.file_size, cid
            ));
        };

        match vault.retrieve(contract_id, cid).await {
            Ok(bytes) => Ok(render_evidence_text(&descriptor.file_name, &bytes)),
            Err(e) => {
                tracing::warn!(file = %descriptor.file_name, cid, error = %e, "Evidence retrieval failed");
                Ok(format!(
                    "Evidence file \"{}\" — decryption failed: {}. File noted as evidence (CID: {}).",
                    descriptor.file_name, e, cid
                ))
            }
        }
    }

    async fn get_milestone(&self, contract_id: &str, milestone_id: &str) -> nescrowee_chain::Result<String> {
        let Some(contract) = self.chain.get_contract(contract_id).await? else {
            return Ok("Contract not found.".to_string());
        };

        let id = milestone_id.trim();
        let Some(milestone) = contract.milestone(id) else {
            return Ok(format!("Milestone \"{}\" not found.", id));
        };

        Ok(format!(
            "Title: {}\nDescription: {}\nAmount: {}\nStatus: {}",
            milestone.title, milestone.description, milestone.amount, milestone.status
        ))
    }

    async fn list_evidence(&self, contract_id: &str) -> nescrowee_chain::Result<String> {
        let evidence = self.evidence(contract_id).await?;
        if evidence.is_empty() {
            return Ok("No evidence files uploaded.".to_string());
        }
        Ok(evidence
            .iter()
            .map(|(m, e)| {
                format!(
                    "- {} ({}, {} bytes) uploaded by {}",
                    e.file_name, e.file_type, e.file_size, m.sender
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_extensions() {
        assert!(is_text_file("notes.md"));
        assert!(is_text_file("LOG.TXT"));
        assert!(is_text_file("data.v2.Json"));
        assert!(!is_text_file("photo.png"));
        assert!(!is_text_file("README"));
    }

    #[test]
    fn test_render_truncates_long_text() {
        let bytes = "a".repeat(6000).into_bytes();
        let rendered = render_evidence_text("log.txt", &bytes);
        assert!(rendered.ends_with("\n... [truncated]"));
        let body = rendered
            .split_once(":\n")
            .map(|(_, b)| b.trim_end_matches("\n... [truncated]"))
            .unwrap();
        assert_eq!(body.chars().count(), MAX_EVIDENCE_CHARS);
    }

    #[test]
    fn test_render_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_EVIDENCE_CHARS);
        let rendered = render_evidence_text("notes.md", text.as_bytes());
        assert!(!rendered.contains("[truncated]"));
    }

    #[test]
    fn test_args_fallbacks() {
        assert_eq!(ToolArgs::new(r#"{"offset": 20}"#).offset(), 20);
        assert_eq!(ToolArgs::new(r#"{"offset": "5"}"#).offset(), 5);
        assert_eq!(ToolArgs::new("garbage").offset(), 0);
        assert_eq!(ToolArgs::new("notes.md").string("fileName"), "notes.md");
        assert_eq!(ToolArgs::new(r#"{"fileName":"a.txt"}"#).string("fileName"), "a.txt");
        assert_eq!(ToolArgs::new(r#"{"milestoneId":3}"#).string("milestoneId"), "3");
    }

    #[test]
    fn test_definitions_names() {
        let names: Vec<String> = definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["read_chat", "read_evidence", "get_milestone", "list_evidence"]);
    }
}
