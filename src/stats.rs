use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime counters for the scoring endpoints. Nothing here is keyed
/// by wallet.
#[derive(Debug)]
pub struct ScoreStats {
    scored: AtomicU64,
    rejected: AtomicU64,
    chain_failures: AtomicU64,
    internal_errors: AtomicU64,
}

impl Default for ScoreStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStats {
    pub const fn new() -> Self {
        Self {
            scored: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            chain_failures: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
        }
    }

    pub fn inc_scored(&self, n: u64) {
        self.scored.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self, n: u64) {
        self.rejected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_chain_failures(&self, n: u64) {
        self.chain_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_internal_errors(&self, n: u64) {
        self.internal_errors.fetch_add(n, Ordering::Relaxed);
    }

    /// Relaxed loads, so the fields may come from slightly different instants.
    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            scored: self.scored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            chain_failures: self.chain_failures.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoreSnapshot {
    pub scored: u64,
    pub rejected: u64,
    pub chain_failures: u64,
    pub internal_errors: u64,
}

pub static SCORE_STATS: ScoreStats = ScoreStats::new();
