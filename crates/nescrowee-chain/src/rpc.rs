//! NEAR JSON-RPC client

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ChainError, Result};

/// Thin JSON-RPC client over one NEAR node
pub struct NearRpcClient {
    url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    cause: Option<Value>,
}

impl RpcErrorBody {
    fn describe(&self) -> String {
        let detail = self
            .cause
            .as_ref()
            .or(self.data.as_ref())
            .map(|v| v.to_string())
            .unwrap_or_default();
        match &self.message {
            Some(message) if !detail.is_empty() => format!("{}: {}", message, detail),
            Some(message) => message.clone(),
            None => detail,
        }
    }
}

#[derive(Deserialize)]
struct CallFunctionResult {
    result: Vec<u8>,
}

/// Nonce and recent block for an access key
#[derive(Debug, Clone, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    /// base58
    pub block_hash: String,
}

/// Final outcome of a committed transaction
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub hash: String,
    /// Decoded `SuccessValue`, if any
    pub value: Option<Vec<u8>>,
}

impl NearRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Configuration(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChainError::Rpc(format!("HTTP {}: {}", status, text)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc.error {
            return Err(ChainError::Rpc(error.describe()));
        }
        let result = rpc
            .result
            .ok_or_else(|| ChainError::InvalidResponse("missing result".to_string()))?;

        // Older nodes report query failures inside the result object
        if let Some(error) = result.get("error").and_then(Value::as_str) {
            return Err(ChainError::Rpc(error.to_string()));
        }
        Ok(result)
    }

    /// Call a view method with JSON args and decode its JSON return value
    pub async fn view_call<T: DeserializeOwned>(
        &self,
        account_id: &str,
        method_name: &str,
        args: &Value,
    ) -> Result<T> {
        let args_bytes =
            serde_json::to_vec(args).map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        let result = self
            .call(
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "final",
                    "account_id": account_id,
                    "method_name": method_name,
                    "args_base64": STANDARD.encode(args_bytes),
                }),
            )
            .await?;

        let call: CallFunctionResult = serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        serde_json::from_slice(&call.result).map_err(|e| {
            ChainError::InvalidResponse(format!("{} returned invalid JSON: {}", method_name, e))
        })
    }

    pub async fn view_access_key(&self, account_id: &str, public_key: &str) -> Result<AccessKeyView> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "final",
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await?;

        serde_json::from_value(result).map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    /// Broadcast a borsh-serialized signed transaction and wait for its final
    /// outcome. A `Failure` status is an error.
    pub async fn broadcast_tx_commit(&self, signed_tx: &[u8]) -> Result<TransactionOutcome> {
        let result = self
            .call("broadcast_tx_commit", json!([STANDARD.encode(signed_tx)]))
            .await?;

        let hash = result
            .pointer("/transaction/hash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let status = result
            .get("status")
            .ok_or_else(|| ChainError::InvalidResponse("missing transaction status".to_string()))?;

        if let Some(failure) = status.get("Failure") {
            return Err(ChainError::Transaction(format!("{} ({})", failure, hash)));
        }

        let value = match status.get("SuccessValue").and_then(Value::as_str) {
            Some(encoded) => Some(
                STANDARD
                    .decode(encoded)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?,
            ),
            None => None,
        };

        Ok(TransactionOutcome { hash, value })
    }
}
