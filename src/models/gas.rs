use crate::error::GasdeckError;
use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The three presets offered by the estimate feed, slowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Slow,
    Average,
    Fast,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Slow, Tier::Average, Tier::Fast];
}

/// What the fee currently emitted by the selector is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Tier(Tier),
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateStatus {
    /// First fetch has not completed yet.
    Pending,
    Ready,
    /// No fetch has ever succeeded.
    Unavailable,
}

/// One tier's price and the expected confirmation wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEstimate {
    pub price_wei: U256,
    pub wait: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimateSnapshot {
    pub slow: TierEstimate,
    pub average: TierEstimate,
    pub fast: TierEstimate,
    pub fetched_at: DateTime<Utc>,
}

impl GasEstimateSnapshot {
    pub fn tier(&self, tier: Tier) -> &TierEstimate {
        match tier {
            Tier::Slow => &self.slow,
            Tier::Average => &self.average,
            Tier::Fast => &self.fast,
        }
    }
}

/// The pair a transaction host consumes. Both halves always change together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSelection {
    pub gas_limit: U256,
    pub gas_price_wei: U256,
}

impl FeeSelection {
    pub fn total_fee_wei(&self) -> Result<U256, GasdeckError> {
        self.gas_limit
            .checked_mul(self.gas_price_wei)
            .ok_or(GasdeckError::FeeOverflow)
    }
}
