use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers_core::types::U256;
use ethers_providers::{Http, Middleware, Provider};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::chains::{ChainProfile, TransferDirection, TransferQuery};
use crate::models::{AssetTransfer, OwnedToken};
use crate::provider::{ChainDataProvider, ProviderError};
use crate::wallet::WalletAddress;

const NFT_OWNER_ENDPOINT: &str = "getNFTsForOwner";
const MAX_OWNED_TOKEN_PAGES: usize = 20;

/// Alchemy-backed client for one chain: JSON-RPC through `ethers`, NFT API
/// through plain `reqwest`.
#[derive(Clone)]
pub struct AlchemyClient {
    provider: Provider<Http>,
    http: reqwest::Client,
    nft_url: Url,
}

impl AlchemyClient {
    pub fn new(rpc_url: &str, nft_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .context("failed to build reqwest client")?;
        let rpc = Url::parse(rpc_url).context("invalid provider RPC url")?;
        let nft_url = Url::parse(nft_url).context("invalid provider NFT url")?;
        let transport = Http::new_with_client(rpc, client.clone());
        let provider = Provider::new(transport);
        Ok(Self {
            provider,
            http: client,
            nft_url,
        })
    }

    pub fn for_chain(profile: &ChainProfile, api_key: &str) -> Result<Self> {
        let (rpc, nft) = alchemy_urls(profile.network, api_key);
        Self::new(&rpc, &nft).with_context(|| format!("failed to build client for {}", profile.id))
    }
}

pub fn alchemy_urls(network: &str, api_key: &str) -> (String, String) {
    (
        format!("https://{}.g.alchemy.com/v2/{}", network, api_key),
        format!(
            "https://{}.g.alchemy.com/nft/v3/{}/{}",
            network, api_key, NFT_OWNER_ENDPOINT
        ),
    )
}

#[async_trait]
impl ChainDataProvider for AlchemyClient {
    async fn transaction_count(&self, wallet: &WalletAddress) -> Result<u64, ProviderError> {
        let nonce = self
            .provider
            .get_transaction_count(wallet.address(), None)
            .await?;
        Ok(u256_to_u64_saturating(nonce))
    }

    async fn asset_transfers(
        &self,
        wallet: &WalletAddress,
        query: &TransferQuery,
    ) -> Result<Vec<AssetTransfer>, ProviderError> {
        let params = transfer_params(wallet, query);
        let response: AssetTransfersResponse = self
            .provider
            .request("alchemy_getAssetTransfers", [params])
            .await?;
        Ok(response.transfers.into_iter().map(AssetTransfer::from).collect())
    }

    /// `orderBy=transferTime` lists the newest acquisitions first, so the
    /// earliest one sits on the last page. Pages are followed via `pageKey`
    /// up to `MAX_OWNED_TOKEN_PAGES`.
    async fn owned_tokens(
        &self,
        wallet: &WalletAddress,
        page_size: u32,
    ) -> Result<Vec<OwnedToken>, ProviderError> {
        let mut tokens = Vec::new();
        let mut page_key: Option<String> = None;

        for _ in 0..MAX_OWNED_TOKEN_PAGES {
            let mut query = vec![
                ("owner", wallet.to_string()),
                ("pageSize", page_size.to_string()),
                ("orderBy", "transferTime".to_string()),
                ("withMetadata", "false".to_string()),
            ];
            if let Some(key) = page_key.take() {
                query.push(("pageKey", key));
            }

            let res = self
                .http
                .get(self.nft_url.clone())
                .query(&query)
                .send()
                .await?;
            if !res.status().is_success() {
                return Err(ProviderError::Status {
                    endpoint: NFT_OWNER_ENDPOINT,
                    status: res.status(),
                });
            }
            let body: OwnedNftsResponse =
                res.json().await.map_err(|e| ProviderError::Decode {
                    endpoint: NFT_OWNER_ENDPOINT,
                    reason: e.to_string(),
                })?;

            tokens.extend(body.owned_nfts.into_iter().map(OwnedToken::from));
            match body.page_key.filter(|k| !k.is_empty()) {
                Some(next) => page_key = Some(next),
                None => return Ok(tokens),
            }
        }

        tracing::debug!(
            wallet = %wallet,
            tokens = tokens.len(),
            "owned token page limit reached"
        );
        Ok(tokens)
    }
}

fn transfer_params(wallet: &WalletAddress, query: &TransferQuery) -> serde_json::Value {
    let address_key = match query.direction {
        TransferDirection::Outgoing => "fromAddress",
        TransferDirection::Incoming => "toAddress",
    };
    let categories: Vec<&str> = query.categories.iter().map(|c| c.as_str()).collect();
    let mut params = json!({
        "fromBlock": "0x0",
        "toBlock": "latest",
        "category": categories,
        "maxCount": format!("0x{:x}", query.max_count),
        "order": "asc",
        "withMetadata": true,
        "excludeZeroValue": false,
    });
    params[address_key] = json!(wallet.to_string());
    params
}

#[derive(Debug, Serialize, Deserialize)]
struct AssetTransfersResponse {
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransfer {
    hash: Option<String>,
    block_num: Option<String>,
    metadata: Option<BlockMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockMetadata {
    block_timestamp: Option<String>,
}

impl From<RawTransfer> for AssetTransfer {
    fn from(raw: RawTransfer) -> Self {
        Self {
            hash: raw.hash,
            block_num: raw.block_num,
            timestamp: raw
                .metadata
                .and_then(|m| m.block_timestamp)
                .as_deref()
                .and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedNftsResponse {
    #[serde(default)]
    owned_nfts: Vec<RawOwnedNft>,
    page_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOwnedNft {
    contract: Option<RawContract>,
    token_id: Option<String>,
    acquired_at: Option<BlockMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawContract {
    address: Option<String>,
}

impl From<RawOwnedNft> for OwnedToken {
    fn from(raw: RawOwnedNft) -> Self {
        Self {
            contract: raw.contract.and_then(|c| c.address),
            token_id: raw.token_id,
            acquired_at: raw
                .acquired_at
                .and_then(|m| m.block_timestamp)
                .as_deref()
                .and_then(parse_timestamp),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn u256_to_u64_saturating(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::TransferCategory;
    use chrono::TimeZone;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn outgoing_query_uses_from_address() {
        let query = TransferQuery {
            categories: vec![TransferCategory::External, TransferCategory::Erc20],
            direction: TransferDirection::Outgoing,
            max_count: 1,
        };
        let params = transfer_params(&wallet(), &query);
        assert_eq!(
            params["fromAddress"],
            "0x00000000000000000000000000000000000000aa"
        );
        assert!(params.get("toAddress").is_none());
        assert_eq!(params["category"], json!(["external", "erc20"]));
        assert_eq!(params["maxCount"], "0x1");
        assert_eq!(params["order"], "asc");
    }

    #[test]
    fn incoming_query_uses_to_address() {
        let query = TransferQuery {
            categories: vec![TransferCategory::Erc20],
            direction: TransferDirection::Incoming,
            max_count: 16,
        };
        let params = transfer_params(&wallet(), &query);
        assert!(params.get("fromAddress").is_none());
        assert_eq!(params["maxCount"], "0x10");
    }

    #[test]
    fn decodes_transfer_timestamps() {
        let raw = json!({
            "transfers": [
                {
                    "blockNum": "0xf4240",
                    "hash": "0xabc",
                    "metadata": { "blockTimestamp": "2021-06-01T10:00:00.000Z" }
                },
                { "blockNum": "0xf4241", "hash": "0xdef" }
            ],
            "pageKey": "next"
        });
        let decoded: AssetTransfersResponse = serde_json::from_value(raw).unwrap();
        let transfers: Vec<AssetTransfer> =
            decoded.transfers.into_iter().map(AssetTransfer::from).collect();
        assert_eq!(
            transfers[0].timestamp,
            Some(Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(transfers[1].timestamp, None);
        assert_eq!(transfers[1].hash.as_deref(), Some("0xdef"));
    }

    #[test]
    fn decodes_owned_token_acquisition() {
        let raw = json!({
            "ownedNfts": [
                {
                    "contract": { "address": "0x123" },
                    "tokenId": "7",
                    "acquiredAt": { "blockTimestamp": "2019-02-03T04:05:06Z", "blockNumber": "1" }
                }
            ],
            "totalCount": 1
        });
        let decoded: OwnedNftsResponse = serde_json::from_value(raw).unwrap();
        let token = OwnedToken::from(decoded.owned_nfts.into_iter().next().unwrap());
        assert_eq!(token.contract.as_deref(), Some("0x123"));
        assert_eq!(
            token.acquired_at,
            Some(Utc.with_ymd_and_hms(2019, 2, 3, 4, 5, 6).unwrap())
        );
    }

    #[test]
    fn malformed_timestamp_is_unknown() {
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn builds_network_urls() {
        let (rpc, nft) = alchemy_urls("polygon-mainnet", "key123");
        assert_eq!(rpc, "https://polygon-mainnet.g.alchemy.com/v2/key123");
        assert_eq!(
            nft,
            "https://polygon-mainnet.g.alchemy.com/nft/v3/key123/getNFTsForOwner"
        );
    }

    #[test]
    fn nonce_conversion_saturates() {
        assert_eq!(u256_to_u64_saturating(U256::from(42u64)), 42);
        assert_eq!(u256_to_u64_saturating(U256::MAX), u64::MAX);
    }

    async fn spawn_nft_pages() -> (String, tokio::task::JoinHandle<()>) {
        use axum::{extract::Query, routing::get, Json, Router};
        use std::collections::HashMap;

        async fn pages(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            let token = |id: &str, ts: &str| {
                json!({
                    "contract": { "address": "0xc0" },
                    "tokenId": id,
                    "acquiredAt": { "blockTimestamp": ts }
                })
            };
            match params.get("pageKey").map(String::as_str) {
                None => Json(json!({
                    "ownedNfts": [
                        token("3", "2024-05-01T00:00:00Z"),
                        token("2", "2022-05-01T00:00:00Z")
                    ],
                    "pageKey": "second"
                })),
                Some("second") => Json(json!({
                    "ownedNfts": [token("1", "2018-05-01T00:00:00Z")]
                })),
                Some(_) => Json(json!({ "ownedNfts": [] })),
            }
        }

        let app = Router::new().route("/nft/getNFTsForOwner", get(pages));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/nft/getNFTsForOwner", addr), handle)
    }

    #[tokio::test]
    async fn owned_tokens_follow_page_keys_to_oldest() {
        let (nft_url, handle) = spawn_nft_pages().await;
        let client = AlchemyClient::new("http://127.0.0.1:1", &nft_url).unwrap();

        let tokens = client.owned_tokens(&wallet(), 2).await.unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].token_id.as_deref(), Some("3"));
        assert_eq!(
            tokens.iter().filter_map(|t| t.acquired_at).min(),
            Some(Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap())
        );
        handle.abort();
    }
}
