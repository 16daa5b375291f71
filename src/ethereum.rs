use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder, ReqwestProvider};
use alloy::rpc::types::BlockNumberOrTag;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::address::WalletAddress;
use crate::chain::ChainProvider;
use crate::config::{ChainConfig, Config};
use crate::types::Balance;

/// EVM chain provider using JSON-RPC `eth_getBalance`.
///
/// The HTTP transport is built once, so every lookup against this chain goes
/// through the same connection pool.
#[derive(Debug, Clone)]
pub struct EthereumProvider {
    provider: ReqwestProvider,
    symbol: String,
    decimals: u8,
    timeout: Duration,
}

impl EthereumProvider {
    pub fn new(rpc_url: &str, symbol: String, decimals: u8, timeout: Duration) -> Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("invalid RPC url '{rpc_url}'"))?;
        let provider: ReqwestProvider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            symbol,
            decimals,
            timeout,
        })
    }

    pub fn from_chain(chain: &ChainConfig, timeout: Duration) -> Result<Self> {
        Self::new(
            &chain.rpc,
            chain.native_token.symbol.clone(),
            chain.native_token.decimals,
            timeout,
        )
    }

    /// Provider for the `ethereum` entry of the built-in configuration
    pub fn new_mainnet() -> Result<Self> {
        let config = Config::load()?;
        let chain = config
            .get_chain("ethereum")
            .ok_or_else(|| anyhow!("built-in config has no 'ethereum' chain"))?;
        Self::from_chain(chain, config.limits.request_timeout())
    }
}

#[async_trait]
impl ChainProvider for EthereumProvider {
    async fn get_native_balance(&self, address: &WalletAddress) -> Result<Balance> {
        let request = self
            .provider
            .get_balance(address.as_address())
            .block_id(BlockNumberOrTag::Latest.into());
        let balance = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| anyhow!("eth_getBalance timed out after {:?}", self.timeout))??;

        Ok(Balance::new(self.symbol.clone(), balance, self.decimals))
    }
}
