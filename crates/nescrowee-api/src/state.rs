//! Application state shared across handlers

use std::sync::Arc;
use std::time::Instant;

use nescrowee_agent::{Coordinator, Poller};

/// Identity of the running agent, echoed by the status endpoints
#[derive(Debug, Clone)]
pub struct AgentInfo {
    /// NEAR account the agent signs with
    pub agent: String,
    pub network: String,
    /// Escrow contract account
    pub contract: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub poller: Arc<Poller>,
    pub info: AgentInfo,
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state
    pub fn new(coordinator: Arc<Coordinator>, poller: Arc<Poller>, info: AgentInfo) -> Self {
        Self {
            coordinator,
            poller,
            info,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
