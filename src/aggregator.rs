use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::chains::{ChainId, ChainProfile, ChainRegistry, FallbackStage};
use crate::models::{ChainActivity, ScoreReport, WalletActivity};
use crate::provider::{ChainDataProvider, ProviderError};
use crate::score::{self, ScoreError, ScoreParams};
use crate::stats::SCORE_STATS;
use crate::wallet::{WalletAddress, WalletError};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum ScoreRequestError {
    #[error(transparent)]
    InvalidWallet(#[from] WalletError),
    #[error(transparent)]
    Internal(#[from] ScoreError),
}

/// Fans a wallet out to every enabled chain, joins the results and scores them.
#[derive(Clone)]
pub struct Aggregator {
    registry: ChainRegistry,
    providers: BTreeMap<ChainId, Arc<dyn ChainDataProvider>>,
    params: ScoreParams,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(registry: ChainRegistry, params: ScoreParams) -> Self {
        Self {
            registry,
            providers: BTreeMap::new(),
            params,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_provider(mut self, chain: ChainId, provider: Arc<dyn ChainDataProvider>) -> Self {
        self.providers.insert(chain, provider);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub async fn score(&self, raw_wallet: &str) -> Result<ScoreReport, ScoreRequestError> {
        let wallet = WalletAddress::parse(raw_wallet)?;
        let activity = self.collect_activity(&wallet).await;
        let report = self.score_activity(&wallet, activity, Utc::now())?;
        info!(
            wallet = %wallet,
            score = report.result.score,
            label = report.result.label.as_str(),
            "wallet scored"
        );
        Ok(report)
    }

    pub fn score_activity(
        &self,
        wallet: &WalletAddress,
        activity: WalletActivity,
        now: DateTime<Utc>,
    ) -> Result<ScoreReport, ScoreError> {
        let result = score::compute(&activity, &self.registry, &self.params, now)?;
        debug!(
            wallet = %wallet,
            tx = result.tx_component,
            age = result.age_component,
            activity = result.activity_component,
            age_days = result.account_age_days,
            total_txs = result.total_transactions,
            "score components"
        );
        Ok(ScoreReport {
            wallet: wallet.to_string(),
            activity,
            result,
        })
    }

    /// Every registry chain gets an entry; failed or disabled chains stay at zero.
    pub async fn collect_activity(&self, wallet: &WalletAddress) -> WalletActivity {
        let mut activity = WalletActivity::for_registry(&self.registry);

        let fetches = self
            .registry
            .enabled()
            .map(|profile| async move { (profile.id, self.fetch_chain(profile, wallet).await) });

        for (chain, outcome) in join_all(fetches).await {
            match outcome {
                Ok(chain_activity) => {
                    debug!(
                        %chain,
                        txs = chain_activity.transaction_count,
                        earliest = ?chain_activity.earliest_activity,
                        "chain activity"
                    );
                    activity.insert(chain, chain_activity);
                }
                Err(err) => {
                    SCORE_STATS.inc_chain_failures(1);
                    warn!(%chain, wallet = %wallet, "chain fetch failed: {}", err);
                    activity.insert(chain, ChainActivity::default());
                }
            }
        }

        activity
    }

    async fn fetch_chain(
        &self,
        profile: &ChainProfile,
        wallet: &WalletAddress,
    ) -> Result<ChainActivity, ProviderError> {
        let provider = self
            .providers
            .get(&profile.id)
            .ok_or(ProviderError::NotConfigured)?;

        let count = self
            .bounded("transaction count", provider.transaction_count(wallet))
            .await?;
        if count == 0 {
            return Ok(ChainActivity::new(0, None));
        }

        let earliest = self.resolve_earliest(profile, provider.as_ref(), wallet).await;
        Ok(ChainActivity::new(count, earliest))
    }

    async fn resolve_earliest(
        &self,
        profile: &ChainProfile,
        provider: &dyn ChainDataProvider,
        wallet: &WalletAddress,
    ) -> Option<DateTime<Utc>> {
        for (step, stage) in profile.fallback.iter().enumerate() {
            match self.run_stage(stage, provider, wallet).await {
                Ok(Some(ts)) => return Some(ts),
                Ok(None) => debug!(chain = %profile.id, step, "no timestamp from stage"),
                Err(err) => warn!(chain = %profile.id, step, "timestamp stage failed: {}", err),
            }
        }
        None
    }

    async fn run_stage(
        &self,
        stage: &FallbackStage,
        provider: &dyn ChainDataProvider,
        wallet: &WalletAddress,
    ) -> Result<Option<DateTime<Utc>>, ProviderError> {
        match stage {
            FallbackStage::Transfers(query) => {
                let transfers = self
                    .bounded("asset transfers", provider.asset_transfers(wallet, query))
                    .await?;
                Ok(transfers.into_iter().filter_map(|t| t.timestamp).min())
            }
            FallbackStage::OwnedTokens { page_size } => {
                let tokens = self
                    .bounded("owned tokens", provider.owned_tokens(wallet, *page_size))
                    .await?;
                Ok(tokens.into_iter().filter_map(|t| t.acquired_at).min())
            }
        }
    }

    async fn bounded<T>(
        &self,
        what: &'static str,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.fetch_timeout, fut)
            .await
            .map_err(|_| ProviderError::Timeout(what))?
    }
}
