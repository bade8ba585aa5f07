//! Escrow contract access

use std::sync::Arc;

use async_trait::async_trait;
use nescrowee_types::{Attestation, ContractSnapshot, DisputeKey, Resolution};
use serde_json::json;

use crate::error::Result;
use crate::rpc::{NearRpcClient, TransactionOutcome};
use crate::signer::{FunctionCall, TransactionSender};
use crate::DEFAULT_GAS;

/// The escrow contract operations the investigator needs
#[async_trait]
pub trait EscrowChain: Send + Sync {
    /// Disputes awaiting an AI resolution
    async fn get_pending_disputes(&self) -> Result<Vec<DisputeKey>>;

    /// Current contract state, `None` if the contract does not exist
    async fn get_contract(&self, contract_id: &str) -> Result<Option<ContractSnapshot>>;

    /// Submit an attested resolution. Not idempotent: a retry after an
    /// ambiguous failure may submit twice.
    async fn submit_ai_resolution(
        &self,
        key: &DisputeKey,
        resolution: &Resolution,
        explanation: &str,
        attestation: &Attestation,
    ) -> Result<TransactionOutcome>;
}

/// [`EscrowChain`] backed by the deployed escrow contract
pub struct NearEscrowClient {
    rpc: Arc<NearRpcClient>,
    sender: Arc<TransactionSender>,
    contract_id: String,
}

impl NearEscrowClient {
    pub fn new(
        rpc: Arc<NearRpcClient>,
        sender: Arc<TransactionSender>,
        contract_id: impl Into<String>,
    ) -> Self {
        Self {
            rpc,
            sender,
            contract_id: contract_id.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }
}

pub(crate) fn submit_args(
    key: &DisputeKey,
    resolution: &Resolution,
    explanation: &str,
    attestation: &Attestation,
) -> serde_json::Value {
    json!({
        "contract_id": key.contract_id,
        "milestone_id": key.milestone_id,
        "resolution": resolution,
        "explanation": explanation,
        "signature": attestation.signature,
        "signing_address": attestation.signing_address,
        "tee_text": attestation.signed_text,
    })
}

#[async_trait]
impl EscrowChain for NearEscrowClient {
    async fn get_pending_disputes(&self) -> Result<Vec<DisputeKey>> {
        self.rpc
            .view_call(&self.contract_id, "get_pending_disputes", &json!({}))
            .await
    }

    async fn get_contract(&self, contract_id: &str) -> Result<Option<ContractSnapshot>> {
        self.rpc
            .view_call(
                &self.contract_id,
                "get_contract",
                &json!({ "contract_id": contract_id }),
            )
            .await
    }

    async fn submit_ai_resolution(
        &self,
        key: &DisputeKey,
        resolution: &Resolution,
        explanation: &str,
        attestation: &Attestation,
    ) -> Result<TransactionOutcome> {
        tracing::info!(dispute = %key, %resolution, "Submitting AI resolution");
        self.sender
            .send(FunctionCall {
                receiver_id: self.contract_id.clone(),
                method_name: "submit_ai_resolution".to_string(),
                args: submit_args(key, resolution, explanation, attestation),
                gas: DEFAULT_GAS,
                deposit: 0,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_args_encoding() {
        let attestation = Attestation {
            signature: vec![1, 2, 3],
            signing_address: vec![4, 5],
            signed_text: "hash:hash".to_string(),
        };
        let args = submit_args(
            &DisputeKey::new("c1", "m1"),
            &Resolution::Split { freelancer_pct: 50 },
            "Both parties share fault",
            &attestation,
        );

        assert_eq!(args["resolution"], json!({"Split": {"freelancer_pct": 50}}));
        assert_eq!(args["signature"], json!([1, 2, 3]));
        assert_eq!(args["signing_address"], json!([4, 5]));
        assert_eq!(args["tee_text"], "hash:hash");

        let unit = submit_args(
            &DisputeKey::new("c1", "m1"),
            &Resolution::ContinueWork,
            "",
            &attestation,
        );
        assert_eq!(unit["resolution"], "ContinueWork");
    }
}
