//! Nescrowee Types - Canonical domain types for the dispute investigator
//!
//! This crate has zero dependencies on other nescrowee crates. It defines:
//!
//! - Dispute keys and completed-dispute records
//! - Escrow contract snapshots and milestones (read-only views of chain state)
//! - Feed messages, evidence descriptors, and transparency records
//! - The closed resolution type and its normalizer
//! - TEE attestations and investigation results
//!
//! # Invariant
//!
//! Only a [`Resolution`] (never a raw model string) can reach the escrow
//! contract. [`normalize`] returns a [`NormalizedResolution`] and callers must
//! match it exhaustively before submitting.

pub mod attestation;
pub mod contract;
pub mod dispute;
pub mod feed;
pub mod investigation;
pub mod resolution;

pub use attestation::*;
pub use contract::*;
pub use dispute::*;
pub use feed::*;
pub use investigation::*;
pub use resolution::*;

/// Namespace the marketplace writes its chat transcripts under in the feed
pub const APP_NAMESPACE: &str = "nescrowee";

/// Evidence vault group holding the encrypted files for one escrow contract
pub fn vault_group(contract_id: &str) -> String {
    format!("{}-{}", APP_NAMESPACE, contract_id)
}
