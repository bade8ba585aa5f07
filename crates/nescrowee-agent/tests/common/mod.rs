//! In-memory collaborators for agent tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use nescrowee_agent::{
    Coordinator, CoordinatorConfig, Investigator, InvestigatorConfig, RingHistory, ToolExecutor,
};
use nescrowee_chain::{ChainError, EscrowChain, MessageFeed, TransactionOutcome};
use nescrowee_llm::{
    AttestationError, AttestationSource, CompletionRequest, CompletionResponse, LLMError,
    LLMProvider, ToolCall,
};
use nescrowee_types::{
    Attestation, ContractSnapshot, DisputeKey, EvidenceDescriptor, FeedMessage, MessageKind,
    Milestone, Resolution,
};
use nescrowee_vault::{EvidenceVault, VaultError};

pub const MODEL: &str = "deepseek-ai/DeepSeek-V3.1";

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Submission {
    pub key: DisputeKey,
    pub resolution: Resolution,
    pub explanation: String,
    pub tee_text: String,
}

#[derive(Default)]
pub struct MockChain {
    pub pending: Mutex<Vec<DisputeKey>>,
    pub fail_pending: Mutex<bool>,
    pub contracts: Mutex<HashMap<String, ContractSnapshot>>,
    pub submissions: Mutex<Vec<Submission>>,
    pub fail_submit: Mutex<bool>,
    pub pending_calls: AtomicUsize,
}

impl MockChain {
    pub fn with_contract(contract_id: &str) -> Self {
        let chain = Self::default();
        chain.contracts.lock().insert(
            contract_id.to_string(),
            ContractSnapshot {
                model_id: MODEL.to_string(),
                milestones: vec![Milestone {
                    id: "m1".to_string(),
                    title: "Landing page".to_string(),
                    description: "Responsive landing page with contact form".to_string(),
                    amount: "5000000000000000000000000".to_string(),
                    status: "Disputed".to_string(),
                }],
            },
        );
        chain
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl EscrowChain for MockChain {
    async fn get_pending_disputes(&self) -> nescrowee_chain::Result<Vec<DisputeKey>> {
        self.pending_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_pending.lock() {
            return Err(ChainError::Network("connection refused".to_string()));
        }
        Ok(self.pending.lock().clone())
    }

    async fn get_contract(&self, contract_id: &str) -> nescrowee_chain::Result<Option<ContractSnapshot>> {
        Ok(self.contracts.lock().get(contract_id).cloned())
    }

    async fn submit_ai_resolution(
        &self,
        key: &DisputeKey,
        resolution: &Resolution,
        explanation: &str,
        attestation: &Attestation,
    ) -> nescrowee_chain::Result<TransactionOutcome> {
        if *self.fail_submit.lock() {
            return Err(ChainError::Transaction("FunctionCallError".to_string()));
        }
        self.submissions.lock().push(Submission {
            key: key.clone(),
            resolution: *resolution,
            explanation: explanation.to_string(),
            tee_text: attestation.signed_text.clone(),
        });
        Ok(TransactionOutcome {
            hash: "tx".to_string(),
            value: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Published {
    pub contract_id: String,
    pub kind: MessageKind,
    pub text: String,
    pub data: Value,
}

#[derive(Default)]
pub struct MockFeed {
    pub messages: Mutex<HashMap<String, Vec<FeedMessage>>>,
    pub published: Mutex<Vec<Published>>,
    pub fail_publish: Mutex<bool>,
}

impl MockFeed {
    pub fn push(&self, contract_id: &str, sender: &str, kind: MessageKind, content: &str, data: Option<Value>) {
        let mut messages = self.messages.lock();
        let list = messages.entry(contract_id.to_string()).or_default();
        let timestamp = 1_700_000_000_000 + list.len() as i64;
        list.push(FeedMessage {
            id: format!("{}/{}", sender, timestamp),
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp,
            kind,
            data,
        });
    }

    pub fn push_context(&self, contract_id: &str, context: &str) {
        self.push(contract_id, "client.testnet", MessageKind::AiContext, context, None);
    }

    pub fn push_evidence(&self, contract_id: &str, sender: &str, descriptor: EvidenceDescriptor) {
        let data = serde_json::to_value(&descriptor).unwrap();
        self.push(contract_id, sender, MessageKind::Evidence, "uploaded evidence", Some(data));
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn published_of(&self, kind: MessageKind) -> Vec<Published> {
        self.published().into_iter().filter(|p| p.kind == kind).collect()
    }
}

#[async_trait]
impl MessageFeed for MockFeed {
    async fn messages(&self, contract_id: &str) -> nescrowee_chain::Result<Vec<FeedMessage>> {
        Ok(self.messages.lock().get(contract_id).cloned().unwrap_or_default())
    }

    async fn publish(
        &self,
        contract_id: &str,
        kind: MessageKind,
        text: &str,
        data: Value,
    ) -> nescrowee_chain::Result<()> {
        if *self.fail_publish.lock() {
            return Err(ChainError::Rpc("storage deposit exhausted".to_string()));
        }
        self.published.lock().push(Published {
            contract_id: contract_id.to_string(),
            kind,
            text: text.to_string(),
            data,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Replays a script of responses, then repeats `fallback` forever
pub struct ScriptedLlm {
    script: Mutex<VecDeque<CompletionResponse>>,
    fallback: Option<CompletionResponse>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    delay: Duration,
}

impl ScriptedLlm {
    pub fn new(script: Vec<CompletionResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(vec![]),
            delay: Duration::ZERO,
        }
    }

    pub fn repeating(response: CompletionResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(vec![])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> nescrowee_llm::Result<CompletionResponse> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests.lock().push(request);
        let next = self.script.lock().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| LLMError::RequestFailed {
                message: "script exhausted".to_string(),
            })
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

pub fn tool_turn(response_id: &str, calls: Vec<ToolCall>) -> CompletionResponse {
    CompletionResponse::with_tool_calls(response_id, calls)
}

pub fn text_turn(response_id: &str, text: &str) -> CompletionResponse {
    CompletionResponse::new(response_id, text)
}

pub fn analysis_turn(response_id: &str, resolution: &str, confidence: u8) -> CompletionResponse {
    text_turn(
        response_id,
        &serde_json::json!({
            "recommended_resolution": resolution,
            "reasoning": "The delivered work was compared against the milestone requirements.",
            "confidence": confidence,
            "evidence_reviewed": ["notes.md"],
            "context_for_freelancer": null
        })
        .to_string(),
    )
}

// ---------------------------------------------------------------------------
// Attestation & vault
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockAttestations {
    pub calls: Mutex<Vec<(String, String)>>,
    pub fail: Mutex<bool>,
}

impl MockAttestations {
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AttestationSource for MockAttestations {
    async fn get_attestation(
        &self,
        response_id: &str,
        model_id: &str,
    ) -> Result<Attestation, AttestationError> {
        self.calls
            .lock()
            .push((response_id.to_string(), model_id.to_string()));
        if *self.fail.lock() {
            return Err(AttestationError::Status {
                status: 404,
                body: "signature not found".to_string(),
            });
        }
        Ok(Attestation {
            signature: vec![1; 64],
            signing_address: vec![2; 32],
            signed_text: format!("attested:{}", response_id),
        })
    }
}

#[derive(Default)]
pub struct MockVault {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub calls: AtomicUsize,
}

impl MockVault {
    pub fn with_file(cid: &str, content: impl Into<Vec<u8>>) -> Self {
        let vault = Self::default();
        vault.files.lock().insert(cid.to_string(), content.into());
        vault
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceVault for MockVault {
    async fn retrieve(&self, _contract_id: &str, cid: &str) -> nescrowee_vault::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .get(cid)
            .cloned()
            .ok_or_else(|| VaultError::Rejected {
                status: 404,
                message: format!("unknown cid {}", cid),
            })
    }
}

pub fn descriptor(file_name: &str, file_type: &str, size: u64, cid: Option<&str>) -> EvidenceDescriptor {
    EvidenceDescriptor {
        file_name: file_name.to_string(),
        file_type: file_type.to_string(),
        file_size: size,
        cid: cid.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub feed: Arc<MockFeed>,
    pub llm: Arc<ScriptedLlm>,
    pub attestations: Arc<MockAttestations>,
    pub vault: Arc<MockVault>,
    pub coordinator: Arc<Coordinator>,
}

impl Harness {
    pub fn new(chain: MockChain, feed: MockFeed, llm: ScriptedLlm) -> Self {
        Self::build(chain, feed, llm, MockVault::default(), CoordinatorConfig::default())
    }

    pub fn build(
        chain: MockChain,
        feed: MockFeed,
        llm: ScriptedLlm,
        vault: MockVault,
        config: CoordinatorConfig,
    ) -> Self {
        let chain = Arc::new(chain);
        let feed = Arc::new(feed);
        let llm = Arc::new(llm);
        let attestations = Arc::new(MockAttestations::default());
        let vault = Arc::new(vault);

        let vault_dyn: Arc<dyn EvidenceVault> = vault.clone();
        let tools = ToolExecutor::new(chain.clone(), feed.clone(), Some(vault_dyn));
        let investigator = Arc::new(Investigator::new(
            llm.clone(),
            tools,
            feed.clone(),
            InvestigatorConfig::default(),
        ));
        let coordinator = Arc::new(Coordinator::new(
            chain.clone(),
            feed.clone(),
            investigator,
            attestations.clone(),
            Arc::new(RingHistory::default()),
            config,
        ));

        Self {
            chain,
            feed,
            llm,
            attestations,
            vault,
            coordinator,
        }
    }
}
