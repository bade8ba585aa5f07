//! Closed resolution type and the normalizer from free-text model output

use std::fmt;

use serde::{Deserialize, Serialize};

/// Share of the milestone paid to the freelancer when a dispute is split
pub const DEFAULT_SPLIT_PCT: u8 = 50;

/// How a disputed milestone is resolved on-chain.
///
/// Serializes to the escrow contract's enum encoding: unit variants as bare
/// strings, `Split` as `{"Split":{"freelancer_pct":N}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Release the milestone funds to the freelancer
    Freelancer,
    /// Refund the milestone funds to the client
    Client,
    /// Keep the milestone open for further work
    ContinueWork,
    /// Divide the funds
    Split { freelancer_pct: u8 },
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Freelancer => write!(f, "Freelancer"),
            Self::Client => write!(f, "Client"),
            Self::ContinueWork => write!(f, "ContinueWork"),
            Self::Split { freelancer_pct } => write!(f, "Split({}%)", freelancer_pct),
        }
    }
}

/// Result of normalizing a model's resolution string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedResolution {
    /// A tag the contract understands
    Known(Resolution),
    /// The raw string, unchanged. Never submitted.
    Unverified(String),
}

impl NormalizedResolution {
    pub fn known(&self) -> Option<Resolution> {
        match self {
            Self::Known(resolution) => Some(*resolution),
            Self::Unverified(_) => None,
        }
    }
}

/// Map a model's free-text resolution to the closed [`Resolution`] type.
///
/// Matching is case-insensitive. `split` always maps to a 50/50 split; any
/// percentage the model proposed is discarded. Unrecognized input passes
/// through as [`NormalizedResolution::Unverified`].
pub fn normalize(raw: &str) -> NormalizedResolution {
    match raw.trim().to_lowercase().as_str() {
        "freelancer" => NormalizedResolution::Known(Resolution::Freelancer),
        "client" => NormalizedResolution::Known(Resolution::Client),
        "continuework" => NormalizedResolution::Known(Resolution::ContinueWork),
        "split" => NormalizedResolution::Known(Resolution::Split {
            freelancer_pct: DEFAULT_SPLIT_PCT,
        }),
        _ => NormalizedResolution::Unverified(raw.to_string()),
    }
}
