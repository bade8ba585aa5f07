//! TEE attestation retrieval
//!
//! After an investigation finishes, the response id of its final model turn is
//! exchanged for a signature produced inside the enclave that served it. There
//! is no fallback: an attempt without an attestation never reaches the chain.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nescrowee_types::Attestation;
use serde::Deserialize;
use thiserror::Error;

/// Errors from fetching an attestation
#[derive(Error, Debug)]
pub enum AttestationError {
    #[error("Attestation request failed: {0}")]
    Network(String),

    #[error("Attestation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed attestation response: {0}")]
    Malformed(String),

    #[error("Invalid base64 in attestation field {field}: {message}")]
    Encoding { field: &'static str, message: String },

    #[error("Attestation client configuration error: {0}")]
    Configuration(String),
}

/// Source of TEE signatures for model responses
#[async_trait]
pub trait AttestationSource: Send + Sync {
    async fn get_attestation(
        &self,
        response_id: &str,
        model_id: &str,
    ) -> Result<Attestation, AttestationError>;
}

#[derive(Deserialize)]
struct SignatureResponse {
    text: String,
    signature: String,
    signing_address: String,
}

/// Client for the `/signature/{response_id}` endpoint of the model API
pub struct SignatureClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SignatureClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AttestationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AttestationError::Configuration(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, AttestationError> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| AttestationError::Encoding {
            field,
            message: e.to_string(),
        })
}

#[async_trait]
impl AttestationSource for SignatureClient {
    async fn get_attestation(
        &self,
        response_id: &str,
        model_id: &str,
    ) -> Result<Attestation, AttestationError> {
        let url = format!("{}/signature/{}", self.base_url, response_id);
        let response = self
            .client
            .get(&url)
            .query(&[("model", model_id), ("signing_algo", "ed25519")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AttestationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttestationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SignatureResponse = response
            .json()
            .await
            .map_err(|e| AttestationError::Malformed(e.to_string()))?;

        let attestation = Attestation {
            signature: decode_field("signature", &body.signature)?,
            signing_address: decode_field("signing_address", &body.signing_address)?,
            signed_text: body.text,
        };

        tracing::info!(
            response_id,
            model_id,
            signature_bytes = attestation.signature.len(),
            "TEE attestation retrieved"
        );

        Ok(attestation)
    }
}
