mod address;
mod aggregator;
mod chain;
mod collector;
mod config;
mod error;
mod ethereum;
mod price;
mod summary;
mod types;

pub use address::{extract_addresses, WalletAddress};
pub use aggregator::{prepare_addresses, BalanceAggregator};
pub use chain::{ChainProvider, ChainRegistry};
pub use collector::{collect_chain_balances, CollectorSettings};
pub use config::{ApiKeyStyle, ChainConfig, Config, ConfigError, Limits, PriceConfig, TokenInfo};
pub use error::RequestError;
pub use ethereum::EthereumProvider;
pub use price::{PriceFetcher, PriceQuote, PriceSource};
pub use summary::{ChainTotal, Summary, UsdValue, DUST_THRESHOLD};
pub use types::{Balance, BalanceReading};

use anyhow::Result;

/// Sum native balances for every address found in `text` across the
/// configured chains, valued in the quote currency
pub async fn check_balances(text: &str) -> Result<Summary> {
    let config = Config::load()?;
    let aggregator = BalanceAggregator::from_config(&config)?;
    Ok(aggregator.check_text(text).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_loads() {
        let config = Config::load();
        assert!(config.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_text_without_addresses() {
        let err = check_balances("hello there").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<RequestError>(),
            Some(&RequestError::NoAddresses)
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_mainnet_balances() {
        let result = check_balances("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").await;

        assert!(result.is_ok());
        let summary = result.unwrap();
        assert_eq!(summary.total_reading_count, 6);
    }
}
