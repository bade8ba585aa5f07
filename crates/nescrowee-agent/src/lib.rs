//! Nescrowee Agent - autonomous dispute investigation
//!
//! - [`Investigator`]: bounded tool loop that turns a dispute context into an
//!   analysis
//! - [`ToolExecutor`]: the read-only tools the model may call
//! - [`Coordinator`]: claim, investigate, attest, submit, publish
//! - [`Poller`]: periodic discovery of pending disputes
//!
//! # Key Principle
//!
//! **The model proposes a resolution, it never submits one.** Only a
//! resolution that normalizes to a known tag and carries a TEE attestation
//! reaches the escrow contract.

pub mod coordinator;
pub mod error;
pub mod investigator;
pub mod poller;
pub mod tools;

pub use coordinator::{
    Coordinator, CoordinatorConfig, HistoryStore, InFlight, Outcome, RingHistory,
    DEFAULT_HISTORY_CAPACITY, DEFAULT_INVESTIGATION_TIMEOUT,
};
pub use error::{AgentError, InvestigationError};
pub use investigator::{
    parse_analysis, render_action, Analysis, Investigator, InvestigatorConfig,
    CORRECTIVE_PROMPT, MAX_REFORMAT_REQUESTS, MAX_TOOL_CALLS,
};
pub use poller::{Poller, TickReport, DEFAULT_POLL_INTERVAL};
pub use tools::{definitions, ToolExecutor, MAX_EVIDENCE_CHARS};
