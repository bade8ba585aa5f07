//! Agent Configuration
//!
//! Every setting comes from a CLI flag or its environment variable. Values
//! that depend on the network preset are filled in by [`Settings::resolve`].

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

use nescrowee_chain::Network;
use nescrowee_llm::NEAR_AI_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Raw settings as parsed from flags and environment
#[derive(Args, Clone)]
pub struct Settings {
    /// NEAR network preset (testnet, mainnet)
    #[arg(long, env = "NEAR_NETWORK", default_value = "testnet", global = true)]
    pub network: String,

    /// NEAR JSON-RPC endpoint (defaults to the preset's node)
    #[arg(long, env = "NEAR_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Escrow contract account
    #[arg(long, env = "NESCROWEE_CONTRACT_ID", global = true)]
    pub contract: Option<String>,

    /// Social feed contract account
    #[arg(long, env = "SOCIAL_DB_CONTRACT_ID", global = true)]
    pub social_contract: Option<String>,

    /// Account the agent signs transactions with
    #[arg(long, env = "AGENT_ACCOUNT_ID", global = true)]
    pub agent_account_id: Option<String>,

    /// `ed25519:<base58>` secret key of the agent account
    #[arg(long, env = "AGENT_PRIVATE_KEY", hide_env_values = true, global = true)]
    pub agent_private_key: Option<String>,

    /// NEAR AI Cloud API key
    #[arg(long, env = "NEAR_AI_KEY", hide_env_values = true, global = true)]
    pub near_ai_key: Option<String>,

    /// NEAR AI Cloud base URL
    #[arg(long, env = "NEAR_AI_BASE_URL", default_value = NEAR_AI_BASE_URL, global = true)]
    pub near_ai_base_url: String,

    /// NOVA proxy URL; evidence decryption is disabled without it
    #[arg(long, env = "NOVA_PROXY_URL", global = true)]
    pub nova_proxy_url: Option<String>,

    #[arg(long, env = "NOVA_API_KEY", hide_env_values = true, global = true)]
    pub nova_api_key: Option<String>,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000, global = true)]
    pub port: u16,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 15, global = true)]
    pub poll_interval_secs: u64,

    /// Per-request timeout for every outbound HTTP call
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 120, global = true)]
    pub request_timeout_secs: u64,

    /// Deadline for one whole dispute attempt
    #[arg(long, env = "INVESTIGATION_TIMEOUT_SECS", default_value_t = 600, global = true)]
    pub investigation_timeout_secs: u64,

    /// Completed disputes kept for the status endpoint
    #[arg(long, env = "HISTORY_CAPACITY", default_value_t = 100, global = true)]
    pub history_capacity: usize,

    /// Verify attestation signatures locally before submitting
    #[arg(long, env = "VERIFY_ATTESTATION", default_value_t = false, global = true)]
    pub verify_attestation: bool,
}

/// Validated configuration
#[derive(Clone)]
pub struct AgentConfig {
    pub network: Network,
    pub rpc_url: String,
    pub contract_id: String,
    pub social_contract_id: String,
    pub agent_account_id: String,
    pub agent_private_key: String,
    pub near_ai_key: String,
    pub near_ai_base_url: String,
    /// Proxy URL and API key, present only when both are set
    pub nova: Option<(String, String)>,
    pub host: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub investigation_timeout: Duration,
    pub history_capacity: usize,
    pub verify_attestation: bool,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url)
            .field("contract_id", &self.contract_id)
            .field("social_contract_id", &self.social_contract_id)
            .field("agent_account_id", &self.agent_account_id)
            .field("agent_private_key", &"[REDACTED]")
            .field("near_ai_key", &"[REDACTED]")
            .field("near_ai_base_url", &self.near_ai_base_url)
            .field("nova_proxy_url", &self.nova.as_ref().map(|(url, _)| url))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("investigation_timeout", &self.investigation_timeout)
            .field("history_capacity", &self.history_capacity)
            .field("verify_attestation", &self.verify_attestation)
            .finish()
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_secs(secs: u64, name: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl Settings {
    /// Validate and apply network preset defaults
    pub fn resolve(self) -> Result<AgentConfig, ConfigError> {
        let network: Network = self.network.parse().map_err(|e: nescrowee_chain::ChainError| {
            ConfigError::Invalid {
                name: "NEAR_NETWORK",
                message: e.to_string(),
            }
        })?;

        let nova = match (optional(self.nova_proxy_url), optional(self.nova_api_key)) {
            (Some(url), Some(key)) => Some((url, key)),
            (Some(_), None) => {
                tracing::warn!("NOVA_PROXY_URL set without NOVA_API_KEY, evidence decryption disabled");
                None
            }
            _ => None,
        };

        Ok(AgentConfig {
            rpc_url: optional(self.rpc_url).unwrap_or_else(|| network.rpc_url().to_string()),
            contract_id: optional(self.contract)
                .unwrap_or_else(|| network.escrow_contract().to_string()),
            social_contract_id: optional(self.social_contract)
                .unwrap_or_else(|| network.social_contract().to_string()),
            agent_account_id: required(self.agent_account_id, "AGENT_ACCOUNT_ID")?,
            agent_private_key: required(self.agent_private_key, "AGENT_PRIVATE_KEY")?,
            near_ai_key: required(self.near_ai_key, "NEAR_AI_KEY")?,
            near_ai_base_url: self.near_ai_base_url.trim_end_matches('/').to_string(),
            nova,
            host: self.host,
            port: self.port,
            poll_interval: positive_secs(self.poll_interval_secs, "POLL_INTERVAL_SECS")?,
            request_timeout: positive_secs(self.request_timeout_secs, "REQUEST_TIMEOUT_SECS")?,
            investigation_timeout: positive_secs(
                self.investigation_timeout_secs,
                "INVESTIGATION_TIMEOUT_SECS",
            )?,
            history_capacity: self.history_capacity,
            verify_attestation: self.verify_attestation,
            network,
        })
    }
}

impl AgentConfig {
    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "HOST",
                message: e.to_string(),
            })
    }
}
