//! Transaction signing for the agent account
//!
//! Transactions are encoded with borsh in the layout the NEAR runtime expects.
//! Only the `FunctionCall` action is ever produced.

use std::io::Write;
use std::sync::Arc;

use borsh::BorshSerialize;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::{ChainError, Result};
use crate::rpc::{NearRpcClient, TransactionOutcome};

const ED25519_PREFIX: &str = "ed25519:";

#[derive(BorshSerialize)]
enum PublicKey {
    Ed25519([u8; 32]),
}

#[derive(BorshSerialize)]
enum Signature {
    Ed25519([u8; 64]),
}

#[derive(BorshSerialize)]
struct FunctionCallAction {
    method_name: String,
    args: Vec<u8>,
    gas: u64,
    deposit: u128,
}

enum Action {
    FunctionCall(FunctionCallAction),
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            // Variant index of FunctionCall in the runtime's Action enum
            Action::FunctionCall(call) => {
                BorshSerialize::serialize(&2u8, writer)?;
                call.serialize(writer)
            }
        }
    }
}

#[derive(BorshSerialize)]
struct Transaction {
    signer_id: String,
    public_key: PublicKey,
    nonce: u64,
    receiver_id: String,
    block_hash: [u8; 32],
    actions: Vec<Action>,
}

#[derive(BorshSerialize)]
struct SignedTransaction {
    transaction: Transaction,
    signature: Signature,
}

/// A single function call to put on chain
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub receiver_id: String,
    pub method_name: String,
    pub args: Value,
    pub gas: u64,
    /// yoctoNEAR
    pub deposit: u128,
}

/// Full-access key of the agent account, held in memory
#[derive(Clone)]
pub struct InMemorySigner {
    account_id: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key())
            .finish()
    }
}

impl InMemorySigner {
    /// Parse an `ed25519:<base58>` secret key. Both the 64-byte
    /// (seed + public key) and the bare 32-byte seed forms are accepted.
    pub fn from_secret_key(account_id: impl Into<String>, secret_key: &str) -> Result<Self> {
        let encoded = secret_key
            .trim()
            .strip_prefix(ED25519_PREFIX)
            .ok_or_else(|| ChainError::InvalidKey("expected ed25519: prefix".to_string()))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?;

        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[..32]);
                seed
            }
            n => {
                return Err(ChainError::InvalidKey(format!(
                    "expected 32 or 64 key bytes, got {}",
                    n
                )))
            }
        };

        let signing_key = SigningKey::from_bytes(&seed);
        if bytes.len() == 64 && signing_key.verifying_key().as_bytes()[..] != bytes[32..] {
            return Err(ChainError::InvalidKey(
                "public half does not match secret seed".to_string(),
            ));
        }

        Ok(Self {
            account_id: account_id.into(),
            signing_key,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// `ed25519:<base58>` public key
    pub fn public_key(&self) -> String {
        format!(
            "{}{}",
            ED25519_PREFIX,
            bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
        )
    }

    /// Build, hash and sign one function-call transaction, returning the
    /// borsh bytes of the signed transaction.
    fn sign_function_call(
        &self,
        call: &FunctionCall,
        nonce: u64,
        block_hash: [u8; 32],
    ) -> Result<Vec<u8>> {
        let args =
            serde_json::to_vec(&call.args).map_err(|e| ChainError::Transaction(e.to_string()))?;

        let transaction = Transaction {
            signer_id: self.account_id.clone(),
            public_key: PublicKey::Ed25519(self.signing_key.verifying_key().to_bytes()),
            nonce,
            receiver_id: call.receiver_id.clone(),
            block_hash,
            actions: vec![Action::FunctionCall(FunctionCallAction {
                method_name: call.method_name.clone(),
                args,
                gas: call.gas,
                deposit: call.deposit,
            })],
        };

        let encoded =
            borsh::to_vec(&transaction).map_err(|e| ChainError::Transaction(e.to_string()))?;
        let hash = Sha256::digest(&encoded);
        let signature = self.signing_key.sign(&hash);

        borsh::to_vec(&SignedTransaction {
            transaction,
            signature: Signature::Ed25519(signature.to_bytes()),
        })
        .map_err(|e| ChainError::Transaction(e.to_string()))
    }
}

/// Sends signed function calls from the agent account.
///
/// The whole nonce-fetch, sign, broadcast sequence holds one lock.
pub struct TransactionSender {
    rpc: Arc<NearRpcClient>,
    signer: InMemorySigner,
    lock: Mutex<()>,
}

impl TransactionSender {
    pub fn new(rpc: Arc<NearRpcClient>, signer: InMemorySigner) -> Self {
        Self {
            rpc,
            signer,
            lock: Mutex::new(()),
        }
    }

    pub fn account_id(&self) -> &str {
        self.signer.account_id()
    }

    pub async fn send(&self, call: FunctionCall) -> Result<TransactionOutcome> {
        let _guard = self.lock.lock().await;

        let access_key = self
            .rpc
            .view_access_key(self.signer.account_id(), &self.signer.public_key())
            .await?;
        let block_hash: [u8; 32] = bs58::decode(&access_key.block_hash)
            .into_vec()
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?
            .try_into()
            .map_err(|_| ChainError::InvalidResponse("block hash is not 32 bytes".to_string()))?;

        let signed = self
            .signer
            .sign_function_call(&call, access_key.nonce + 1, block_hash)?;

        tracing::debug!(
            receiver = %call.receiver_id,
            method = %call.method_name,
            nonce = access_key.nonce + 1,
            "Broadcasting transaction"
        );

        let outcome = self.rpc.broadcast_tx_commit(&signed).await?;
        tracing::info!(
            receiver = %call.receiver_id,
            method = %call.method_name,
            tx_hash = %outcome.hash,
            "Transaction committed"
        );
        Ok(outcome)
    }
}
