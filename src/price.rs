use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PriceConfig;

/// Price of one unit of an asset in the reference currency.
///
/// A failed lookup is reported as a zero price, so `is_available` cannot tell
/// a failure from an asset that is genuinely worth nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub asset_symbol: String,
    pub unit_price: f64,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(asset_symbol: impl Into<String>, unit_price: f64) -> Self {
        Self {
            asset_symbol: asset_symbol.into(),
            unit_price,
            fetched_at: Utc::now(),
        }
    }

    pub fn unavailable(asset_symbol: impl Into<String>) -> Self {
        Self::new(asset_symbol, 0.0)
    }

    pub fn is_available(&self) -> bool {
        self.unit_price > 0.0
    }
}

/// Source of reference-currency quotes
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Symbol of the asset the aggregator values balances in
    fn asset_symbol(&self) -> &str;

    /// Current price of the primary asset; never fails, a failure is a zero quote
    async fn fetch_price(&self) -> PriceQuote;
}

/// `{ "<asset id>": { "<currency>": price } }`
#[derive(Debug, Deserialize)]
struct SimplePriceResponse(HashMap<String, HashMap<String, f64>>);

/// Quote fetcher for CoinGecko-style `simple/price` endpoints
#[derive(Debug, Clone)]
pub struct PriceFetcher {
    client: reqwest::Client,
    config: PriceConfig,
}

impl PriceFetcher {
    pub fn new(config: PriceConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn query(&self) -> Vec<(&str, &str)> {
        let mut query = vec![
            ("ids", self.config.asset_id.as_str()),
            ("vs_currencies", self.config.currency.as_str()),
        ];
        if let (Some(param), Some(key)) = (
            self.config.api_key_style.query_param(),
            self.config.api_key.as_deref(),
        ) {
            query.push((param, key));
        }
        query
    }

    async fn try_fetch_price(&self) -> Result<f64> {
        let url = format!("{}/simple/price", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&self.query())
            .send()
            .await?
            .error_for_status()?;
        let SimplePriceResponse(prices) = response.json().await?;

        let price = prices
            .get(&self.config.asset_id)
            .and_then(|currencies| currencies.get(&self.config.currency))
            .copied()
            .ok_or_else(|| {
                anyhow!(
                    "no {} quote for '{}' in response",
                    self.config.currency,
                    self.config.asset_id
                )
            })?;

        if !price.is_finite() || price < 0.0 {
            return Err(anyhow!("quote service returned invalid price {price}"));
        }
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for PriceFetcher {
    fn asset_symbol(&self) -> &str {
        &self.config.asset_symbol
    }

    async fn fetch_price(&self) -> PriceQuote {
        match self.try_fetch_price().await {
            Ok(price) => {
                debug!(asset = %self.config.asset_id, price, "price fetched");
                PriceQuote::new(&self.config.asset_symbol, price)
            }
            Err(e) => {
                warn!(asset = %self.config.asset_id, "price lookup failed: {e:#}");
                PriceQuote::unavailable(&self.config.asset_symbol)
            }
        }
    }
}
