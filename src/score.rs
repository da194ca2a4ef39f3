//! Pure scoring formula. Everything here is a function of aggregated inputs
//! and an explicit `now`, so it can be tested without any provider.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chains::ChainRegistry;
use crate::models::{ScoreLabel, ScoreResult, WalletActivity};

pub const DEFAULT_MIN_SCORE: i64 = 300;
pub const DEFAULT_MAX_SCORE: i64 = 850;
pub const DEFAULT_PASS_THRESHOLD: i64 = 600;

pub const MAX_TX_COUNT: f64 = 500.0;
pub const MAX_AGE_DAYS: f64 = 730.0;
pub const MAX_NETWORKS: f64 = 5.0;

pub const TX_WEIGHT: f64 = 0.5;
pub const AGE_WEIGHT: f64 = 0.3;
pub const ACTIVITY_WEIGHT: f64 = 0.2;

/// Bonus for wallets with transactions but less than this many days of age.
pub const YOUNG_WALLET_DAYS: u64 = 30;
pub const YOUNG_WALLET_BONUS: f64 = 0.1;

/// Days credited per transaction when no chain reports a first-activity time.
pub const ESTIMATED_DAYS_PER_TX: u64 = 5;
pub const MAX_ESTIMATED_AGE_DAYS: u64 = 365;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("score computation produced a non-finite {component}: {value}")]
    Internal { component: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreParams {
    pub min_score: i64,
    pub max_score: i64,
    pub pass_threshold: i64,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            max_score: DEFAULT_MAX_SCORE,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }
}

impl ScoreParams {
    pub fn label(&self, score: i64) -> ScoreLabel {
        if score >= self.pass_threshold {
            ScoreLabel::Pass
        } else {
            ScoreLabel::Fail
        }
    }
}

/// Account age in whole days from the earliest known activity, or an
/// estimate from the transaction total when no timestamp is known.
pub fn account_age_days(activity: &WalletActivity, now: DateTime<Utc>) -> u64 {
    if let Some(earliest) = activity.earliest_activity() {
        return u64::try_from((now - earliest).num_days()).unwrap_or(0);
    }
    let total = activity.total_transactions();
    if total == 0 {
        return 0;
    }
    total
        .saturating_mul(ESTIMATED_DAYS_PER_TX)
        .min(MAX_ESTIMATED_AGE_DAYS)
}

pub fn tx_component(weighted_tx_count: f64) -> f64 {
    ((1.0 + weighted_tx_count).ln() / (1.0 + MAX_TX_COUNT).ln()).clamp(0.0, 1.0)
}

pub fn age_component(age_days: u64, total_transactions: u64) -> f64 {
    let bonus = if total_transactions > 0 && age_days < YOUNG_WALLET_DAYS {
        YOUNG_WALLET_BONUS
    } else {
        0.0
    };
    ((age_days as f64 / MAX_AGE_DAYS).sqrt() + bonus).clamp(0.0, 1.0)
}

pub fn activity_component(active_networks: usize) -> f64 {
    (active_networks as f64 / MAX_NETWORKS).min(1.0)
}

pub fn compute(
    activity: &WalletActivity,
    registry: &ChainRegistry,
    params: &ScoreParams,
    now: DateTime<Utc>,
) -> Result<ScoreResult, ScoreError> {
    let total_transactions = activity.total_transactions();
    let weighted_tx_count = finite(
        "weighted transaction count",
        activity.weighted_transactions(registry),
    )?;
    let active_networks = activity.active_networks();
    let account_age_days = account_age_days(activity, now);

    let tx = finite("transaction component", tx_component(weighted_tx_count))?;
    let age = finite(
        "age component",
        age_component(account_age_days, total_transactions),
    )?;
    let act = finite("activity component", activity_component(active_networks))?;

    let weighted_sum = TX_WEIGHT * tx + AGE_WEIGHT * age + ACTIVITY_WEIGHT * act;
    let span = params.max_score as f64 - params.min_score as f64;
    let raw = finite(
        "score",
        params.min_score as f64 + weighted_sum * span,
    )?;
    let score = (raw.round() as i64).clamp(params.min_score, params.max_score);

    Ok(ScoreResult {
        score,
        tx_component: tx,
        age_component: age,
        activity_component: act,
        weighted_sum,
        account_age_days,
        total_transactions,
        weighted_tx_count,
        active_networks,
        label: params.label(score),
    })
}

fn finite(component: &'static str, value: f64) -> Result<f64, ScoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScoreError::Internal { component, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{ChainId, ChainProfile};
    use crate::models::ChainActivity;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn activity_with(entries: &[(ChainId, ChainActivity)]) -> (WalletActivity, ChainRegistry) {
        let registry = ChainRegistry::default();
        let mut activity = WalletActivity::for_registry(&registry);
        for (id, a) in entries {
            activity.insert(*id, *a);
        }
        (activity, registry)
    }

    #[test]
    fn empty_wallet_scores_minimum() {
        let (activity, registry) = activity_with(&[]);
        let result = compute(&activity, &registry, &ScoreParams::default(), now()).unwrap();
        assert_eq!(result.score, 300);
        assert_eq!(result.account_age_days, 0);
        assert_eq!(result.tx_component, 0.0);
        assert_eq!(result.age_component, 0.0);
        assert_eq!(result.activity_component, 0.0);
        assert_eq!(result.label, ScoreLabel::Fail);
    }

    #[test]
    fn saturated_ethereum_wallet_scores_762() {
        let first = now() - Duration::days(730);
        let (activity, registry) =
            activity_with(&[(ChainId::Ethereum, ChainActivity::new(500, Some(first)))]);
        let result = compute(&activity, &registry, &ScoreParams::default(), now()).unwrap();
        assert!((result.tx_component - 1.0).abs() < 1e-12);
        assert!((result.age_component - 1.0).abs() < 1e-12);
        assert!((result.activity_component - 0.2).abs() < 1e-12);
        assert!((result.weighted_sum - 0.84).abs() < 1e-12);
        assert_eq!(result.score, 762);
        assert_eq!(result.label, ScoreLabel::Pass);
    }

    #[test]
    fn missing_timestamps_estimate_age_from_count() {
        let (activity, _) = activity_with(&[(ChainId::Ethereum, ChainActivity::new(10, None))]);
        assert_eq!(account_age_days(&activity, now()), 50);

        let (busy, _) = activity_with(&[(ChainId::Polygon, ChainActivity::new(1_000, None))]);
        assert_eq!(account_age_days(&busy, now()), MAX_ESTIMATED_AGE_DAYS);
    }

    #[test]
    fn future_timestamp_clamps_age_to_zero() {
        let future = now() + Duration::days(3);
        let (activity, _) =
            activity_with(&[(ChainId::Base, ChainActivity::new(1, Some(future)))]);
        assert_eq!(account_age_days(&activity, now()), 0);
    }

    #[test]
    fn partial_days_are_floored() {
        let first = now() - Duration::hours(47);
        let (activity, _) =
            activity_with(&[(ChainId::Base, ChainActivity::new(1, Some(first)))]);
        assert_eq!(account_age_days(&activity, now()), 1);
    }

    #[test]
    fn young_active_wallets_get_bonus() {
        assert!((age_component(0, 1) - YOUNG_WALLET_BONUS).abs() < 1e-12);
        assert_eq!(age_component(0, 0), 0.0);
        let at_threshold = age_component(YOUNG_WALLET_DAYS, 1);
        assert!((at_threshold - (30.0f64 / 730.0).sqrt()).abs() < 1e-12);
        assert_eq!(age_component(2_000, 10), 1.0);
    }

    #[test]
    fn tx_component_is_monotonic_and_saturates() {
        let mut previous = 0.0;
        for count in [0.0, 1.0, 2.0, 10.0, 100.0, 499.0, 500.0, 10_000.0] {
            let value = tx_component(count);
            assert!(value >= previous, "{count}");
            assert!((0.0..=1.0).contains(&value));
            previous = value;
        }
        assert_eq!(tx_component(10_000.0), 1.0);
    }

    #[test]
    fn activity_component_caps_at_one() {
        assert_eq!(activity_component(0), 0.0);
        assert!((activity_component(2) - 0.4).abs() < 1e-12);
        assert_eq!(activity_component(9), 1.0);
    }

    #[test]
    fn scores_stay_within_bounds() {
        let registry = ChainRegistry::default();
        let params = ScoreParams::default();
        for count in [0u64, 1, 3, 25, 400, 5_000, u64::MAX] {
            for days in [0i64, 10, 200, 5_000] {
                let mut activity = WalletActivity::for_registry(&registry);
                for id in ChainId::ALL {
                    let ts = (count > 0).then(|| now() - Duration::days(days));
                    activity.insert(id, ChainActivity::new(count, ts));
                }
                let result = compute(&activity, &registry, &params, now()).unwrap();
                assert!(result.score >= params.min_score && result.score <= params.max_score);
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_scores() {
        let first = now() - Duration::days(120);
        let (activity, registry) = activity_with(&[
            (ChainId::Ethereum, ChainActivity::new(42, Some(first))),
            (ChainId::Optimism, ChainActivity::new(7, None)),
        ]);
        let params = ScoreParams::default();
        let a = compute(&activity, &registry, &params, now()).unwrap();
        let b = compute(&activity, &registry, &params, now()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_bounds_and_threshold_apply() {
        let params = ScoreParams {
            min_score: 0,
            max_score: 100,
            pass_threshold: 50,
        };
        let first = now() - Duration::days(730);
        let (activity, registry) =
            activity_with(&[(ChainId::Ethereum, ChainActivity::new(500, Some(first)))]);
        let result = compute(&activity, &registry, &params, now()).unwrap();
        assert_eq!(result.score, 84);
        assert_eq!(result.label, ScoreLabel::Pass);
    }

    #[test]
    fn extreme_bounds_do_not_overflow() {
        let params = ScoreParams {
            min_score: i64::MIN,
            max_score: i64::MAX,
            pass_threshold: 0,
        };
        let first = now() - Duration::days(730);
        let (activity, registry) =
            activity_with(&[(ChainId::Ethereum, ChainActivity::new(500, Some(first)))]);
        let result = compute(&activity, &registry, &params, now()).unwrap();
        assert!(result.score > 0);

        let (empty, registry) = activity_with(&[]);
        let result = compute(&empty, &registry, &params, now()).unwrap();
        assert_eq!(result.score, i64::MIN);
    }

    #[test]
    fn corrupt_weight_is_an_internal_error() {
        let registry = ChainRegistry::from_profiles([ChainProfile::new(
            ChainId::Ethereum,
            "eth-mainnet",
            f64::NAN,
            true,
            true,
        )]);
        let mut activity = WalletActivity::for_registry(&registry);
        activity.insert(ChainId::Ethereum, ChainActivity::new(5, None));
        let err = compute(&activity, &registry, &ScoreParams::default(), now()).unwrap_err();
        assert!(matches!(err, ScoreError::Internal { .. }));
    }
}
