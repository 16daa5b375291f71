use anyhow::Result;
use async_trait::async_trait;

use crate::address::WalletAddress;
use crate::config::{validate_chains, ChainConfig, Config, ConfigError};
use crate::types::Balance;

/// Trait for chain providers - implement this for each blockchain
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Get the native token balance for an address at the latest block
    async fn get_native_balance(&self, address: &WalletAddress) -> Result<Balance>;
}

/// The fixed, ordered set of chains balances are collected from.
///
/// Built once from configuration and handed to the aggregator; iteration
/// follows configuration order.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> Result<Self, ConfigError> {
        validate_chains(&chains)?;
        Ok(Self { chains })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.chains.clone())
    }

    pub fn get(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|chain| chain.id == chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keeps_config_order() {
        let config = Config::load().unwrap();
        let registry = ChainRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 6);
        let names: Vec<&str> = registry.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Ethereum", "Base", "Arbitrum", "Polygon", "Optimism", "BSC"]
        );
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = ChainRegistry::from_config(&Config::load().unwrap()).unwrap();
        assert_eq!(registry.get("bsc").unwrap().native_token.symbol, "BNB");
        assert_eq!(registry.get("polygon").unwrap().native_token.symbol, "POL");
        assert!(registry.get("solana").is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let config = Config::load().unwrap();
        let mut chains = config.chains.clone();
        chains.push(chains[1].clone());
        assert_eq!(
            ChainRegistry::new(chains).unwrap_err(),
            ConfigError::DuplicateChain("base".to_string())
        );
        assert_eq!(ChainRegistry::new(Vec::new()).unwrap_err(), ConfigError::NoChains);
    }
}
