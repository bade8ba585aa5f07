//! Agent errors

use std::time::Duration;

use nescrowee_chain::ChainError;
use nescrowee_llm::{AttestationError, LLMError};
use nescrowee_types::AttestationVerifyError;
use thiserror::Error;

/// Errors that end an investigation without a result
#[derive(Error, Debug)]
pub enum InvestigationError {
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Investigation budget exceeded: {reason}")]
    BudgetExceeded { reason: String },

    #[error("Agent failed to produce a valid analysis")]
    NoValidAnalysis,
}

/// Errors that fail one dispute attempt
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Investigation(#[from] InvestigationError),

    #[error("Attestation error: {0}")]
    Attestation(#[from] AttestationError),

    #[error("Attestation rejected: {0}")]
    AttestationInvalid(#[from] AttestationVerifyError),

    #[error("Contract {0} not found")]
    ContractNotFound(String),

    #[error("Unrecognized resolution \"{0}\"; refusing to submit")]
    UnverifiedResolution(String),

    #[error("Investigation timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, AgentError>;
