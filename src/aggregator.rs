use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{error, info, instrument, Instrument};

use crate::address::{extract_addresses, WalletAddress};
use crate::chain::{ChainProvider, ChainRegistry};
use crate::collector::{collect_chain_balances, CollectorSettings};
use crate::config::{ChainConfig, Config, Limits};
use crate::error::RequestError;
use crate::ethereum::EthereumProvider;
use crate::price::{PriceFetcher, PriceQuote, PriceSource};
use crate::summary::Summary;
use crate::types::BalanceReading;

/// Extract addresses from `text` and enforce the per-request ceiling
pub fn prepare_addresses(text: &str, limit: usize) -> Result<Vec<WalletAddress>, RequestError> {
    let addresses = extract_addresses(text);
    if addresses.is_empty() {
        return Err(RequestError::NoAddresses);
    }
    if addresses.len() > limit {
        return Err(RequestError::TooManyAddresses {
            found: addresses.len(),
            limit,
        });
    }
    Ok(addresses)
}

/// Collects balances on every registered chain and values them
pub struct BalanceAggregator {
    registry: ChainRegistry,
    providers: Vec<Arc<dyn ChainProvider>>,
    price: Arc<dyn PriceSource>,
    settings: CollectorSettings,
    max_addresses: usize,
}

impl BalanceAggregator {
    /// Wire up JSON-RPC providers and the quote fetcher described by `config`.
    ///
    /// Fails if any chain's RPC url does not parse.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = ChainRegistry::from_config(config)?;
        let timeout = config.limits.request_timeout();
        let price = PriceFetcher::new(config.price.clone(), timeout)?;

        let providers = registry
            .iter()
            .map(|chain| -> Result<Arc<dyn ChainProvider>> {
                let provider = EthereumProvider::from_chain(chain, timeout)
                    .with_context(|| format!("chain '{}'", chain.id))?;
                Ok(Arc::new(provider))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_parts(registry, providers, Arc::new(price), &config.limits))
    }

    pub fn with_providers<F>(
        registry: ChainRegistry,
        provider_for: F,
        price: Arc<dyn PriceSource>,
        limits: &Limits,
    ) -> Self
    where
        F: FnMut(&ChainConfig) -> Arc<dyn ChainProvider>,
    {
        let providers = registry.iter().map(provider_for).collect();
        Self::from_parts(registry, providers, price, limits)
    }

    fn from_parts(
        registry: ChainRegistry,
        providers: Vec<Arc<dyn ChainProvider>>,
        price: Arc<dyn PriceSource>,
        limits: &Limits,
    ) -> Self {
        Self {
            registry,
            providers,
            price,
            settings: limits.into(),
            max_addresses: limits.max_addresses,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn max_addresses(&self) -> usize {
        self.max_addresses
    }

    /// Full request: parse free-form text, check the ceiling, aggregate
    pub async fn check_text(&self, text: &str) -> Result<Summary, RequestError> {
        let addresses = match prepare_addresses(text, self.max_addresses) {
            Ok(addresses) => addresses,
            Err(e) => {
                info!("request rejected: {e}");
                return Err(e);
            }
        };
        Ok(self.aggregate(&addresses).await)
    }

    /// Look up every address on every chain, plus the primary asset price.
    ///
    /// One task per chain and one for the price run concurrently; all of
    /// them settle before the summary is built. A chain task that dies is
    /// recorded as a failed zero reading for each of its addresses.
    #[instrument(skip_all, fields(addresses = addresses.len(), chains = self.registry.len()))]
    pub async fn aggregate(&self, addresses: &[WalletAddress]) -> Summary {
        let shared: Arc<[WalletAddress]> = addresses.into();

        let chain_tasks: Vec<_> = self
            .registry
            .iter()
            .zip(&self.providers)
            .map(|(chain, provider)| {
                let chain = chain.clone();
                let provider = Arc::clone(provider);
                let addresses = Arc::clone(&shared);
                let settings = self.settings;
                tokio::spawn(
                    async move {
                        collect_chain_balances(&chain, provider.as_ref(), &addresses, settings)
                            .await
                    }
                    .in_current_span(),
                )
            })
            .collect();

        let price_source = Arc::clone(&self.price);
        let price_task = tokio::spawn(async move { price_source.fetch_price().await }.in_current_span());

        let (chain_results, price_result) = tokio::join!(join_all(chain_tasks), price_task);

        let results: Vec<(ChainConfig, Vec<BalanceReading>)> = self
            .registry
            .iter()
            .zip(chain_results)
            .map(|(chain, result)| {
                let readings = match result {
                    Ok(readings) => {
                        info!(chain = %chain.id, "completed balances");
                        readings
                    }
                    Err(e) => {
                        error!(chain = %chain.id, "balance collection failed: {e}");
                        addresses
                            .iter()
                            .map(|address| BalanceReading::failed(&chain.id, *address))
                            .collect()
                    }
                };
                (chain.clone(), readings)
            })
            .collect();

        let price = price_result.unwrap_or_else(|e| {
            error!("price task failed: {e}");
            PriceQuote::unavailable(self.price.asset_symbol())
        });

        let summary = Summary::build(addresses.len(), &results, price);
        info!(
            active = summary.active_reading_count,
            failed = summary.failed_reading_count,
            total = summary.total_reading_count,
            "aggregation complete"
        );
        summary
    }
}
