use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Largest page the owned-token endpoint accepts.
pub const OWNED_TOKENS_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
}

impl ChainId {
    pub const ALL: [ChainId; 5] = [
        ChainId::Ethereum,
        ChainId::Polygon,
        ChainId::Arbitrum,
        ChainId::Optimism,
        ChainId::Base,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Polygon => "polygon",
            ChainId::Arbitrum => "arbitrum",
            ChainId::Optimism => "optimism",
            ChainId::Base => "base",
        }
    }

    /// Prefix used for per-chain environment variables, e.g. `POLYGON_ENABLED`.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "ETHEREUM",
            ChainId::Polygon => "POLYGON",
            ChainId::Arbitrum => "ARBITRUM",
            ChainId::Optimism => "OPTIMISM",
            ChainId::Base => "BASE",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferCategory {
    External,
    Internal,
    Erc20,
    Erc721,
    Erc1155,
}

impl TransferCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferCategory::External => "external",
            TransferCategory::Internal => "internal",
            TransferCategory::Erc20 => "erc20",
            TransferCategory::Erc721 => "erc721",
            TransferCategory::Erc1155 => "erc1155",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferQuery {
    pub categories: Vec<TransferCategory>,
    pub direction: TransferDirection,
    pub max_count: u32,
}

/// One step of the earliest-activity lookup. Stages run in order until one
/// yields a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackStage {
    Transfers(TransferQuery),
    /// Owned tokens ordered by transfer time. The provider returns the newest
    /// acquisitions first, so every page is read and the minimum kept.
    OwnedTokens { page_size: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainProfile {
    pub id: ChainId,
    /// Alchemy network slug, e.g. `eth-mainnet`.
    pub network: &'static str,
    pub weight: f64,
    pub supports_internal_transfers: bool,
    pub supports_token_acquisition: bool,
    pub enabled: bool,
    pub fallback: Vec<FallbackStage>,
}

impl ChainProfile {
    pub fn new(
        id: ChainId,
        network: &'static str,
        weight: f64,
        supports_internal_transfers: bool,
        supports_token_acquisition: bool,
    ) -> Self {
        let mut profile = Self {
            id,
            network,
            weight,
            supports_internal_transfers,
            supports_token_acquisition,
            enabled: true,
            fallback: Vec::new(),
        };
        profile.fallback = profile.default_fallback();
        profile
    }

    pub fn with_fallback(mut self, fallback: Vec<FallbackStage>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn broad_categories(&self) -> Vec<TransferCategory> {
        let mut categories = vec![TransferCategory::External];
        if self.supports_internal_transfers {
            categories.push(TransferCategory::Internal);
        }
        categories.extend([
            TransferCategory::Erc20,
            TransferCategory::Erc721,
            TransferCategory::Erc1155,
        ]);
        categories
    }

    fn default_fallback(&self) -> Vec<FallbackStage> {
        let broad = self.broad_categories();
        let mut stages = vec![
            FallbackStage::Transfers(TransferQuery {
                categories: broad.clone(),
                direction: TransferDirection::Outgoing,
                max_count: 1,
            }),
            FallbackStage::Transfers(TransferQuery {
                categories: broad,
                direction: TransferDirection::Incoming,
                max_count: 1,
            }),
            FallbackStage::Transfers(TransferQuery {
                categories: vec![TransferCategory::Erc20],
                direction: TransferDirection::Incoming,
                max_count: 1,
            }),
        ];
        if self.supports_token_acquisition {
            stages.push(FallbackStage::OwnedTokens {
                page_size: OWNED_TOKENS_PAGE_SIZE,
            });
        }
        stages
    }
}

/// Read-only table of chain profiles, built once at startup.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    profiles: BTreeMap<ChainId, ChainProfile>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::from_profiles([
            ChainProfile::new(ChainId::Ethereum, "eth-mainnet", 1.0, true, true),
            ChainProfile::new(ChainId::Polygon, "polygon-mainnet", 0.6, true, false),
            ChainProfile::new(ChainId::Arbitrum, "arb-mainnet", 0.8, false, false),
            ChainProfile::new(ChainId::Optimism, "opt-mainnet", 0.8, false, false),
            ChainProfile::new(ChainId::Base, "base-mainnet", 0.7, false, false),
        ])
    }
}

impl ChainRegistry {
    pub fn from_profiles(profiles: impl IntoIterator<Item = ChainProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn get(&self, id: ChainId) -> Option<&ChainProfile> {
        self.profiles.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainProfile> {
        self.profiles.values()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &ChainProfile> {
        self.profiles.values().filter(|p| p.enabled)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn set_enabled(&mut self, id: ChainId, enabled: bool) {
        if let Some(profile) = self.profiles.get_mut(&id) {
            profile.enabled = enabled;
        }
    }
}
