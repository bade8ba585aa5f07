//! TEE attestations over model responses

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from checking an attestation locally
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AttestationVerifyError {
    #[error("Signature must be 64 bytes, got {0}")]
    SignatureLength(usize),

    #[error("Signing address must be a 32-byte ed25519 key, got {0} bytes")]
    AddressLength(usize),

    #[error("Signing address is not a valid ed25519 key")]
    InvalidAddress,

    #[error("Signature does not match the signed text")]
    Mismatch,
}

/// A signature produced by trusted hardware over the text of one model
/// response.
///
/// Bound to the response id it was fetched for; the engine's final response
/// is the only valid subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub signature: Vec<u8>,
    pub signing_address: Vec<u8>,
    pub signed_text: String,
}

impl Attestation {
    /// Check the ed25519 signature over `signed_text`, using the signing
    /// address as the public key.
    pub fn verify(&self) -> Result<(), AttestationVerifyError> {
        let signature: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| AttestationVerifyError::SignatureLength(self.signature.len()))?;
        let address: [u8; 32] = self
            .signing_address
            .as_slice()
            .try_into()
            .map_err(|_| AttestationVerifyError::AddressLength(self.signing_address.len()))?;

        let key = VerifyingKey::from_bytes(&address)
            .map_err(|_| AttestationVerifyError::InvalidAddress)?;
        key.verify(self.signed_text.as_bytes(), &Signature::from_bytes(&signature))
            .map_err(|_| AttestationVerifyError::Mismatch)
    }
}
