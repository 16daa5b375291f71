use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for all supported chains, the price source and request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub chains: Vec<ChainConfig>,
    pub price: PriceConfig,
    #[serde(default)]
    pub limits: Limits,
}

/// Configuration for a single chain
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub id: String,
    pub name: String,
    pub rpc: String,
    #[serde(rename = "chainId", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(rename = "nativeToken")]
    pub native_token: TokenInfo,
}

/// Native token information from config
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

/// Quote service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceConfig {
    pub base_url: String,
    pub asset_symbol: String,
    pub asset_id: String,
    pub currency: String,
    #[serde(default)]
    pub api_key_style: ApiKeyStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// How the quote provider expects its API key to be attached.
///
/// Free and paid tiers of the same provider use different query parameter
/// names, so the name is part of configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStyle {
    #[default]
    None,
    Demo,
    Pro,
    Custom(String),
}

impl ApiKeyStyle {
    /// Query parameter carrying the key, if the style sends one
    pub fn query_param(&self) -> Option<&str> {
        match self {
            ApiKeyStyle::None => None,
            ApiKeyStyle::Demo => Some("x_cg_demo_api_key"),
            ApiKeyStyle::Pro => Some("x_cg_pro_api_key"),
            ApiKeyStyle::Custom(name) => Some(name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Limits {
    pub max_addresses: usize,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_addresses: 200,
            batch_size: 10,
            batch_delay_ms: 100,
            request_timeout_secs: 10,
        }
    }
}

impl Limits {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no chains configured")]
    NoChains,
    #[error("chain '{0}' is configured more than once")]
    DuplicateChain(String),
    #[error("limit '{0}' must be greater than zero")]
    ZeroLimit(&'static str),
}

fn default_decimals() -> u8 {
    18
}

pub(crate) fn validate_chains(chains: &[ChainConfig]) -> Result<(), ConfigError> {
    if chains.is_empty() {
        return Err(ConfigError::NoChains);
    }

    let mut seen = HashSet::new();
    for chain in chains {
        if !seen.insert(chain.id.as_str()) {
            return Err(ConfigError::DuplicateChain(chain.id.clone()));
        }
    }

    Ok(())
}

impl Config {
    /// Load configuration from embedded JSON
    pub fn load() -> Result<Self> {
        let config_str = include_str!("../config.json");
        Self::from_json(config_str)
    }

    /// Load configuration from a JSON file on disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&config_str)
    }

    pub fn from_json(config_str: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chains(&self.chains)?;

        if self.limits.max_addresses == 0 {
            return Err(ConfigError::ZeroLimit("maxAddresses"));
        }
        if self.limits.batch_size == 0 {
            return Err(ConfigError::ZeroLimit("batchSize"));
        }

        Ok(())
    }

    /// Get a specific chain configuration
    pub fn get_chain(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|chain| chain.id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let config = Config::load().unwrap();
        let ids: Vec<&str> = config.chains.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["ethereum", "base", "arbitrum", "polygon", "optimism", "bsc"]
        );
    }

    #[test]
    fn test_ethereum_config() {
        let config = Config::load().unwrap();
        let ethereum = config.get_chain("ethereum").unwrap();
        assert_eq!(ethereum.name, "Ethereum");
        assert_eq!(ethereum.native_token.symbol, "ETH");
        assert_eq!(ethereum.native_token.decimals, 18);
        assert_eq!(ethereum.chain_id, Some(1));
    }

    #[test]
    fn test_default_limits() {
        let config = Config::load().unwrap();
        assert_eq!(config.limits.max_addresses, 200);
        assert_eq!(config.limits.batch_size, 10);
        assert_eq!(config.limits.batch_delay(), Duration::from_millis(100));
        assert_eq!(config.limits.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_decimals_default_to_18() {
        let json = r#"{
            "chains": [{ "id": "x", "name": "X", "rpc": "http://localhost", "nativeToken": { "symbol": "X" } }],
            "price": { "baseUrl": "http://localhost", "assetSymbol": "ETH", "assetId": "ethereum", "currency": "usd" }
        }"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.chains[0].native_token.decimals, 18);
        assert_eq!(config.price.api_key_style, ApiKeyStyle::None);
        assert_eq!(config.limits.max_addresses, 200);
    }

    #[test]
    fn test_duplicate_chain_rejected() {
        let mut config = Config::load().unwrap();
        let first = config.chains[0].clone();
        config.chains.push(first);
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateChain("ethereum".to_string()))
        );
    }

    #[test]
    fn test_empty_chains_rejected() {
        let mut config = Config::load().unwrap();
        config.chains.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoChains));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = Config::load().unwrap();
        config.limits.batch_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroLimit("batchSize")));
    }

    #[test]
    fn test_api_key_styles() {
        assert_eq!(ApiKeyStyle::None.query_param(), None);
        assert_eq!(ApiKeyStyle::Demo.query_param(), Some("x_cg_demo_api_key"));
        assert_eq!(ApiKeyStyle::Pro.query_param(), Some("x_cg_pro_api_key"));

        let custom: ApiKeyStyle = serde_json::from_str(r#"{ "custom": "apikey" }"#).unwrap();
        assert_eq!(custom.query_param(), Some("apikey"));
    }
}
