//! Nescrowee Chain - NEAR access for the dispute investigator
//!
//! This crate provides:
//! - A JSON-RPC client for view calls and transaction broadcast ([`NearRpcClient`])
//! - A borsh transaction signer for the agent account ([`TransactionSender`])
//! - The escrow contract surface the agent uses ([`EscrowChain`])
//! - The public chat feed stored in the social contract ([`MessageFeed`])
//!
//! # Invariant
//!
//! Nonce fetch, signing and broadcast for one account are serialized, so the
//! agent never races itself for a nonce.

pub mod error;
pub mod escrow;
pub mod feed;
pub mod rpc;
pub mod signer;

pub use error::*;
pub use escrow::*;
pub use feed::*;
pub use rpc::*;
pub use signer::*;

/// 300 Tgas, the per-call gas used for every agent transaction
pub const DEFAULT_GAS: u64 = 300_000_000_000_000;

/// Network presets for the public NEAR deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://rpc.testnet.near.org",
            Self::Mainnet => "https://rpc.mainnet.near.org",
        }
    }

    pub fn escrow_contract(&self) -> &'static str {
        match self {
            Self::Testnet => "nescrowee.testnet",
            Self::Mainnet => "nescrowee.near",
        }
    }

    pub fn social_contract(&self) -> &'static str {
        match self {
            Self::Testnet => "v1.social08.testnet",
            Self::Mainnet => "social.near",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(ChainError::Configuration(format!("unknown network: {}", other))),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
