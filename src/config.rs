use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::aggregator::DEFAULT_FETCH_TIMEOUT;
use crate::chains::{ChainId, ChainRegistry};
use crate::score::ScoreParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_host: String,
    pub port: u16,
    pub debug: bool,
    pub score: ScoreParams,
    pub fetch_timeout: Duration,
    pub chains: ChainRegistry,
    /// Provider credential per enabled chain, after falling back to the shared key.
    pub api_keys: BTreeMap<ChainId, String>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("MIN_SCORE ({min}) must be below MAX_SCORE ({max})")]
    InvalidScoreRange { min: i64, max: i64 },
    #[error("missing ALCHEMY_API_KEY (or {0}_API_KEY) for enabled chain {1}")]
    MissingApiKey(&'static str, ChainId),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_host = lookup("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let debug = parse_bool_or(&lookup, "DEBUG", false)?;

        let defaults = ScoreParams::default();
        let score = ScoreParams {
            min_score: parse_or(&lookup, "MIN_SCORE", defaults.min_score)?,
            max_score: parse_or(&lookup, "MAX_SCORE", defaults.max_score)?,
            pass_threshold: parse_or(&lookup, "PASS_THRESHOLD", defaults.pass_threshold)?,
        };
        if score.min_score >= score.max_score {
            return Err(ConfigError::InvalidScoreRange {
                min: score.min_score,
                max: score.max_score,
            });
        }

        let fetch_timeout = Duration::from_secs(parse_or(
            &lookup,
            "FETCH_TIMEOUT_SECS",
            DEFAULT_FETCH_TIMEOUT.as_secs(),
        )?);

        let shared_key = non_empty(lookup("ALCHEMY_API_KEY"));
        let mut chains = ChainRegistry::default();
        let mut api_keys = BTreeMap::new();
        for id in ChainId::ALL {
            let prefix = id.env_prefix();
            let enabled = parse_bool_or(&lookup, &format!("{}_ENABLED", prefix), true)?;
            chains.set_enabled(id, enabled);
            if !enabled {
                continue;
            }
            let key = non_empty(lookup(&format!("{}_API_KEY", prefix)))
                .or_else(|| shared_key.clone())
                .ok_or(ConfigError::MissingApiKey(prefix, id))?;
            api_keys.insert(id, key);
        }

        Ok(Self {
            http_host,
            port,
            debug,
            score,
            fetch_timeout,
            chains,
            api_keys,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(lookup(key)) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match non_empty(lookup(key)) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        },
    }
}
