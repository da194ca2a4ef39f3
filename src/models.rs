use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chains::{ChainId, ChainRegistry};

/// Transaction count at or above which a chain counts as an active network.
pub const ACTIVE_NETWORK_MIN_TXS: u64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChainActivity {
    pub transaction_count: u64,
    pub earliest_activity: Option<DateTime<Utc>>,
}

impl ChainActivity {
    pub fn new(transaction_count: u64, earliest_activity: Option<DateTime<Utc>>) -> Self {
        Self {
            transaction_count,
            earliest_activity,
        }
    }

    pub fn is_active(&self) -> bool {
        self.transaction_count >= ACTIVE_NETWORK_MIN_TXS
    }
}

/// Per-request activity across every configured chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletActivity {
    pub chains: BTreeMap<ChainId, ChainActivity>,
}

impl WalletActivity {
    /// Starts with a zero entry for every chain in the registry, enabled or not.
    pub fn for_registry(registry: &ChainRegistry) -> Self {
        Self {
            chains: registry
                .iter()
                .map(|p| (p.id, ChainActivity::default()))
                .collect(),
        }
    }

    pub fn insert(&mut self, chain: ChainId, activity: ChainActivity) {
        self.chains.insert(chain, activity);
    }

    pub fn get(&self, chain: ChainId) -> Option<&ChainActivity> {
        self.chains.get(&chain)
    }

    pub fn total_transactions(&self) -> u64 {
        self.chains
            .values()
            .fold(0u64, |acc, a| acc.saturating_add(a.transaction_count))
    }

    /// Σ(count × weight); chains missing from the registry weigh nothing.
    pub fn weighted_transactions(&self, registry: &ChainRegistry) -> f64 {
        self.chains
            .iter()
            .map(|(id, a)| {
                let weight = registry.get(*id).map(|p| p.weight).unwrap_or(0.0);
                a.transaction_count as f64 * weight
            })
            .sum()
    }

    pub fn active_networks(&self) -> usize {
        self.chains.values().filter(|a| a.is_active()).count()
    }

    pub fn earliest_activity(&self) -> Option<DateTime<Utc>> {
        self.chains.values().filter_map(|a| a.earliest_activity).min()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreLabel {
    Pass,
    Fail,
}

impl ScoreLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLabel::Pass => "pass",
            ScoreLabel::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: i64,
    pub tx_component: f64,
    pub age_component: f64,
    pub activity_component: f64,
    pub weighted_sum: f64,
    pub account_age_days: u64,
    pub total_transactions: u64,
    pub weighted_tx_count: f64,
    pub active_networks: usize,
    pub label: ScoreLabel,
}

/// Score together with the per-chain inputs that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub wallet: String,
    pub activity: WalletActivity,
    pub result: ScoreResult,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetTransfer {
    pub hash: Option<String>,
    pub block_num: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedToken {
    pub contract: Option<String>,
    pub token_id: Option<String>,
    pub acquired_at: Option<DateTime<Utc>>,
}
