use async_trait::async_trait;

use crate::chains::TransferQuery;
use crate::models::{AssetTransfer, OwnedToken};
use crate::wallet::WalletAddress;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("rpc error: {0}")]
    Rpc(#[from] ethers_providers::ProviderError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("failed to decode {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("no provider configured")]
    NotConfigured,
}

/// Chain-data source for a single chain.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn transaction_count(&self, wallet: &WalletAddress) -> Result<u64, ProviderError>;

    /// Transfers matching `query`, oldest first.
    async fn asset_transfers(
        &self,
        wallet: &WalletAddress,
        query: &TransferQuery,
    ) -> Result<Vec<AssetTransfer>, ProviderError>;

    /// Every owned token across all pages, in provider order.
    async fn owned_tokens(
        &self,
        wallet: &WalletAddress,
        page_size: u32,
    ) -> Result<Vec<OwnedToken>, ProviderError>;
}
