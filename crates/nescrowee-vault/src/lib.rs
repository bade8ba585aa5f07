//! Nescrowee Vault - encrypted evidence retrieval
//!
//! Evidence files are encrypted client-side and stored in a per-contract vault
//! group (see [`nescrowee_types::vault_group`]). The investigator is a member
//! of every group and reads files through the NOVA proxy, which performs the
//! decryption.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nescrowee_types::vault_group;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the evidence vault
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault request failed: {0}")]
    Network(String),

    #[error("Vault rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed vault response: {0}")]
    Malformed(String),

    #[error("Vault configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Source of decrypted evidence bytes
#[async_trait]
pub trait EvidenceVault: Send + Sync {
    /// Fetch and decrypt the file `cid` from the contract's vault group
    async fn retrieve(&self, contract_id: &str, cid: &str) -> Result<Vec<u8>>;
}

/// Connection settings for the NOVA proxy
#[derive(Clone)]
pub struct NovaConfig {
    pub proxy_url: String,
    pub api_key: String,
    /// Account the vault membership is registered to
    pub account_id: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for NovaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NovaConfig")
            .field("proxy_url", &self.proxy_url)
            .field("api_key", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    action: &'static str,
    near_account_id: &'a str,
    contract_id: &'a str,
    group_name: String,
    cid: &'a str,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    data: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// [`EvidenceVault`] over the NOVA HTTP proxy
pub struct NovaVaultClient {
    config: NovaConfig,
    client: reqwest::Client,
}

impl NovaVaultClient {
    pub fn new(config: NovaConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(VaultError::Configuration("NOVA API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VaultError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl EvidenceVault for NovaVaultClient {
    async fn retrieve(&self, contract_id: &str, cid: &str) -> Result<Vec<u8>> {
        let request = RetrieveRequest {
            action: "retrieve",
            near_account_id: &self.config.account_id,
            contract_id,
            group_name: vault_group(contract_id),
            cid,
        };

        let response = self
            .client
            .post(&self.config.proxy_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VaultError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(VaultError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| VaultError::Malformed(e.to_string()))?;
        let bytes = STANDARD
            .decode(body.data.trim())
            .map_err(|e| VaultError::Malformed(e.to_string()))?;

        tracing::debug!(contract_id, cid, bytes = bytes.len(), "Evidence retrieved");
        Ok(bytes)
    }
}
