//! Dispute coordinator
//!
//! Runs the full pipeline for one dispute: context read, investigation,
//! attestation, normalization, submission, publication. At most one attempt
//! per dispute key runs at a time; the claim is released when the attempt
//! ends, however it ends.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use nescrowee_chain::{EscrowChain, MessageFeed};
use nescrowee_llm::AttestationSource;
use nescrowee_types::{
    normalize, CompletedDispute, DisputeKey, NormalizedResolution, ResolutionRecord,
};

use crate::error::{AgentError, Result};
use crate::investigator::Investigator;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_INVESTIGATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Result of one `process` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Resolution submitted on-chain
    Resolved { resolution: String, confidence: u8 },
    /// No `ai_context` message for the contract yet
    NoContext,
    /// Another attempt holds the key
    AlreadyProcessing,
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved {
                resolution,
                confidence,
            } => write!(f, "resolved: {} ({}%)", resolution, confidence),
            Self::NoContext => write!(f, "no context found"),
            Self::AlreadyProcessing => write!(f, "already processing"),
            Self::Failed(message) => write!(f, "error: {}", message),
        }
    }
}

/// Recent completed disputes, for observability only
pub trait HistoryStore: Send + Sync {
    fn record(&self, entry: CompletedDispute);

    /// The last `n` entries, oldest first
    fn recent(&self, n: usize) -> Vec<CompletedDispute>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded in-memory [`HistoryStore`]; the oldest entry is evicted first
pub struct RingHistory {
    entries: Mutex<VecDeque<CompletedDispute>>,
    capacity: usize,
}

impl RingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }
}

impl Default for RingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStore for RingHistory {
    fn record(&self, entry: CompletedDispute) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn recent(&self, n: usize) -> Vec<CompletedDispute> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// A dispute currently being processed
#[derive(Debug, Clone, Serialize)]
pub struct InFlight {
    pub key: DisputeKey,
    pub since: DateTime<Utc>,
}

type InFlightSet = Arc<DashMap<DisputeKey, DateTime<Utc>>>;

/// Claim on a dispute key; dropping it releases the key
struct InFlightGuard {
    set: InFlightSet,
    key: DisputeKey,
}

impl InFlightGuard {
    /// Atomically claim `key`, or `None` if it is already claimed
    fn claim(set: &InFlightSet, key: &DisputeKey) -> Option<Self> {
        match set.entry(key.clone()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(vacant) => {
                vacant.insert(Utc::now());
            }
        }
        Some(Self {
            set: set.clone(),
            key: key.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub investigation_timeout: Duration,
    /// Check the attestation signature locally before submitting
    pub verify_attestation: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            investigation_timeout: DEFAULT_INVESTIGATION_TIMEOUT,
            verify_attestation: false,
        }
    }
}

pub struct Coordinator {
    chain: Arc<dyn EscrowChain>,
    feed: Arc<dyn MessageFeed>,
    investigator: Arc<Investigator>,
    attestations: Arc<dyn AttestationSource>,
    history: Arc<dyn HistoryStore>,
    in_flight: InFlightSet,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(
        chain: Arc<dyn EscrowChain>,
        feed: Arc<dyn MessageFeed>,
        investigator: Arc<Investigator>,
        attestations: Arc<dyn AttestationSource>,
        history: Arc<dyn HistoryStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            chain,
            feed,
            investigator,
            attestations,
            history,
            in_flight: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn chain(&self) -> &Arc<dyn EscrowChain> {
        &self.chain
    }

    /// Keys currently being processed, oldest claim first
    pub fn in_flight(&self) -> Vec<InFlight> {
        let mut entries: Vec<InFlight> = self
            .in_flight
            .iter()
            .map(|e| InFlight {
                key: e.key().clone(),
                since: *e.value(),
            })
            .collect();
        entries.sort_by(|a, b| a.since.cmp(&b.since).then_with(|| a.key.cmp(&b.key)));
        entries
    }

    pub fn recent(&self, n: usize) -> Vec<CompletedDispute> {
        self.history.recent(n)
    }

    pub fn completed_count(&self) -> usize {
        self.history.len()
    }

    /// Process one dispute end to end. Never fails; errors become
    /// [`Outcome::Failed`].
    pub async fn process(&self, key: DisputeKey) -> Outcome {
        let Some(_guard) = InFlightGuard::claim(&self.in_flight, &key) else {
            tracing::debug!(dispute = %key, "Dispute already processing");
            return Outcome::AlreadyProcessing;
        };

        let span = tracing::info_span!("investigation", dispute = %key, attempt = %Uuid::new_v4());
        let timeout = self.config.investigation_timeout;

        async {
            tracing::info!("Processing dispute");
            let result = match tokio::time::timeout(timeout, self.run(&key)).await {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout(timeout)),
            };

            match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Dispute attempt failed");
                    Outcome::Failed(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, key: &DisputeKey) -> Result<Outcome> {
        let Some(context) = self.feed.read_context(&key.contract_id).await? else {
            tracing::info!("No ai_context found, skipping");
            return Ok(Outcome::NoContext);
        };

        let contract = self
            .chain
            .get_contract(&key.contract_id)
            .await?
            .ok_or_else(|| AgentError::ContractNotFound(key.contract_id.clone()))?;
        let model_id = contract.model_id;
        tracing::info!(model = %model_id, "Investigating");

        let result = self
            .investigator
            .investigate(&model_id, &key.contract_id, &context)
            .await?;

        let attestation = self
            .attestations
            .get_attestation(&result.response_id, &model_id)
            .await?;
        if self.config.verify_attestation {
            attestation.verify()?;
        }

        let resolution = match normalize(&result.resolution) {
            NormalizedResolution::Known(resolution) => resolution,
            NormalizedResolution::Unverified(raw) => {
                return Err(AgentError::UnverifiedResolution(raw))
            }
        };

        self.chain
            .submit_ai_resolution(key, &resolution, &result.explanation, &attestation)
            .await?;
        tracing::info!(%resolution, confidence = result.confidence, "Resolution submitted on-chain");

        let record = ResolutionRecord {
            analysis: result.explanation.clone(),
            confidence: result.confidence,
            model_id,
            tee_verified: true,
            resolution: result.resolution.clone(),
            explanation: result.explanation.clone(),
            context_for_freelancer: result.context_for_freelancer.clone(),
        };
        if let Err(e) = self.feed.post_resolution(&key.contract_id, &record).await {
            tracing::warn!(error = %e, "Failed to publish resolution record");
        }

        self.history.record(CompletedDispute::new(
            key,
            result.resolution.clone(),
            result.confidence,
        ));

        Ok(Outcome::Resolved {
            resolution: result.resolution,
            confidence: result.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_rendering() {
        let resolved = Outcome::Resolved {
            resolution: "Freelancer".to_string(),
            confidence: 85,
        };
        assert_eq!(resolved.to_string(), "resolved: Freelancer (85%)");
        assert_eq!(Outcome::NoContext.to_string(), "no context found");
        assert_eq!(Outcome::AlreadyProcessing.to_string(), "already processing");
        assert_eq!(
            Outcome::Failed("Chain error: boom".to_string()).to_string(),
            "error: Chain error: boom"
        );
    }

    #[test]
    fn test_ring_history_evicts_oldest() {
        let history = RingHistory::new(3);
        for i in 0..5 {
            history.record(CompletedDispute::new(
                &DisputeKey::new("c", format!("m{}", i)),
                "Client",
                50,
            ));
        }
        assert_eq!(history.len(), 3);
        let recent = history.recent(10);
        let ids: Vec<&str> = recent.iter().map(|d| d.milestone_id.as_str()).collect();
        assert_eq!(ids, ["m2", "m3", "m4"]);
        assert_eq!(history.recent(1)[0].milestone_id, "m4");
    }

    #[test]
    fn test_guard_claims_once_and_releases() {
        let set: InFlightSet = Arc::new(DashMap::new());
        let key = DisputeKey::new("c1", "m1");

        let guard = InFlightGuard::claim(&set, &key).unwrap();
        assert!(InFlightGuard::claim(&set, &key).is_none());
        assert!(set.contains_key(&key));

        drop(guard);
        assert!(!set.contains_key(&key));
        assert!(InFlightGuard::claim(&set, &key).is_some());
    }
}
