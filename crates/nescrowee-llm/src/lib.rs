//! Nescrowee LLM - model access for the dispute investigator
//!
//! This crate talks to an OpenAI-compatible chat API running inside a TEE
//! (NEAR AI Cloud by default):
//!
//! - [`OpenAICompatProvider`]: chat completions with tool calling
//! - [`SignatureClient`]: fetches the TEE signature over a finished response
//!
//! ## Key Design Principles
//!
//! 1. The model may **propose** a resolution, NEVER submit one
//! 2. Every response id that ends an investigation must be attested
//! 3. All outputs are validated before use

pub mod attestation;
pub mod providers;
pub mod types;

pub use attestation::*;
pub use providers::*;
pub use types::*;
