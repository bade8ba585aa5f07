//! Public chat feed stored in the social contract
//!
//! Layout: `account -> nescrowee -> chat -> contract_id -> message_key ->
//! {text, timestamp, type, data}`. Every participant writes under their own
//! account, so a contract's transcript is assembled by reading the wildcard
//! key across all accounts and flattening.

use std::sync::Arc;

use async_trait::async_trait;
use nescrowee_types::{
    FeedMessage, InvestigationStep, MessageKind, ResolutionRecord, APP_NAMESPACE,
};
use serde_json::{json, Map, Value};

use crate::error::{ChainError, Result};
use crate::rpc::NearRpcClient;
use crate::signer::{FunctionCall, TransactionSender};
use crate::DEFAULT_GAS;

/// Page size for transcript reads
pub const CHAT_PAGE_SIZE: usize = 50;

/// 0.05 NEAR storage deposit attached to every feed write
pub const FEED_WRITE_DEPOSIT: u128 = 50_000_000_000_000_000_000_000;

/// Read and append access to a contract's chat transcript.
///
/// Implementors provide the two primitives; the typed reads and writes are
/// derived from them.
#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// All messages for the contract, ordered by timestamp ascending
    async fn messages(&self, contract_id: &str) -> Result<Vec<FeedMessage>>;

    /// Append one message under the agent's account
    async fn publish(
        &self,
        contract_id: &str,
        kind: MessageKind,
        text: &str,
        data: Value,
    ) -> Result<()>;

    /// Content of the latest `ai_context` message; blank content counts as
    /// no context
    async fn read_context(&self, contract_id: &str) -> Result<Option<String>> {
        let messages = self.messages(contract_id).await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.kind == MessageKind::AiContext)
            .last()
            .map(|m| m.content)
            .filter(|content| !content.trim().is_empty()))
    }

    /// Party-visible messages (`text` and `evidence`), one page from `offset`
    async fn read_chat(&self, contract_id: &str, offset: usize) -> Result<Vec<FeedMessage>> {
        let messages = self.messages(contract_id).await?;
        Ok(messages
            .into_iter()
            .filter(|m| matches!(m.kind, MessageKind::Text | MessageKind::Evidence))
            .skip(offset)
            .take(CHAT_PAGE_SIZE)
            .collect())
    }

    /// `evidence` messages that carry a descriptor payload
    async fn evidence_messages(&self, contract_id: &str) -> Result<Vec<FeedMessage>> {
        let messages = self.messages(contract_id).await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.kind == MessageKind::Evidence && m.data.is_some())
            .collect())
    }

    async fn post_step(&self, contract_id: &str, step: &InvestigationStep) -> Result<()> {
        let data =
            serde_json::to_value(step).map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        self.publish(contract_id, MessageKind::AiStep, &step.thought, data)
            .await
    }

    async fn post_resolution(&self, contract_id: &str, record: &ResolutionRecord) -> Result<()> {
        let data = serde_json::to_value(record)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        self.publish(contract_id, MessageKind::AiResolution, "AI Resolution", data)
            .await
    }
}

/// Flatten the social contract's nested `get` result into a sorted transcript
pub fn flatten_chat(root: &Value, contract_id: &str) -> Vec<FeedMessage> {
    let mut messages = Vec::new();
    let Some(accounts) = root.as_object() else {
        return messages;
    };

    for (account_id, account_data) in accounts {
        let Some(chat) = account_data
            .get(APP_NAMESPACE)
            .and_then(|ns| ns.get("chat"))
            .and_then(|chat| chat.get(contract_id))
            .and_then(Value::as_object)
        else {
            continue;
        };

        for (message_key, entry) in chat {
            messages.push(FeedMessage {
                id: format!("{}/{}", account_id, message_key),
                sender: account_id.clone(),
                content: entry
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                timestamp: parse_timestamp(entry.get("timestamp")),
                kind: entry
                    .get("type")
                    .and_then(Value::as_str)
                    .map(|t| MessageKind::from(t.to_string()))
                    .unwrap_or(MessageKind::Text),
                data: parse_data(entry.get("data")),
            });
        }
    }

    messages.sort_by_key(|m| m.timestamp);
    messages
}

fn parse_timestamp(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

/// `data` is stored as a JSON string; invalid JSON is dropped
fn parse_data(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => serde_json::from_str(s).ok(),
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// [`MessageFeed`] over the NEAR social contract
pub struct SocialDbFeed {
    rpc: Arc<NearRpcClient>,
    sender: Arc<TransactionSender>,
    social_contract_id: String,
}

impl SocialDbFeed {
    pub fn new(
        rpc: Arc<NearRpcClient>,
        sender: Arc<TransactionSender>,
        social_contract_id: impl Into<String>,
    ) -> Self {
        Self {
            rpc,
            sender,
            social_contract_id: social_contract_id.into(),
        }
    }
}

#[async_trait]
impl MessageFeed for SocialDbFeed {
    async fn messages(&self, contract_id: &str) -> Result<Vec<FeedMessage>> {
        let keys = [format!("*/{}/chat/{}/**", APP_NAMESPACE, contract_id)];
        let root: Value = self
            .rpc
            .view_call(&self.social_contract_id, "get", &json!({ "keys": keys }))
            .await?;
        Ok(flatten_chat(&root, contract_id))
    }

    async fn publish(
        &self,
        contract_id: &str,
        kind: MessageKind,
        text: &str,
        data: Value,
    ) -> Result<()> {
        let message_key = chrono::Utc::now().timestamp_millis().to_string();
        let entry = json!({
            "text": text,
            "timestamp": message_key,
            "type": kind.as_str(),
            "data": data.to_string(),
        });

        let mut chat = Map::new();
        chat.insert(message_key, entry);
        let payload = json!({
            self.sender.account_id(): {
                APP_NAMESPACE: { "chat": { contract_id: chat } }
            }
        });

        self.sender
            .send(FunctionCall {
                receiver_id: self.social_contract_id.clone(),
                method_name: "set".to_string(),
                args: json!({ "data": payload }),
                gas: DEFAULT_GAS,
                deposit: FEED_WRITE_DEPOSIT,
            })
            .await?;
        tracing::debug!(contract_id, %kind, "Feed message published");
        Ok(())
    }
}
