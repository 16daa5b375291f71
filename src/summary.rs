use std::collections::BTreeMap;

use serde::Serialize;

use crate::address::WalletAddress;
use crate::config::ChainConfig;
use crate::price::PriceQuote;
use crate::types::BalanceReading;

/// Totals below this many native units are left out of displayed breakdowns
pub const DUST_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainTotal {
    pub chain_id: String,
    pub name: String,
    pub symbol: String,
    pub total: f64,
    pub ok_readings: usize,
    pub failed_addresses: Vec<WalletAddress>,
}

impl ChainTotal {
    fn from_readings(chain: &ChainConfig, readings: &[BalanceReading]) -> Self {
        Self {
            chain_id: chain.id.clone(),
            name: chain.name.clone(),
            symbol: chain.native_token.symbol.clone(),
            total: readings.iter().map(|r| r.amount).sum(),
            ok_readings: readings.iter().filter(|r| r.ok).count(),
            failed_addresses: readings
                .iter()
                .filter(|r| !r.ok)
                .map(|r| r.address)
                .collect(),
        }
    }

    pub fn is_dust(&self) -> bool {
        self.total < DUST_THRESHOLD
    }
}

/// Value of the primary-asset holdings in the reference currency
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum UsdValue {
    Value(f64),
    /// Balances exist but no usable quote came back
    PriceUnavailable,
    /// Nothing to value
    NoBalance,
}

/// Result of one aggregation request
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub address_count: usize,
    /// One entry per chain, in registry order
    pub chains: Vec<ChainTotal>,
    /// Chains sharing a native symbol are folded together
    pub symbol_totals: BTreeMap<String, f64>,
    pub price: PriceQuote,
    pub usd_value: UsdValue,
    pub active_reading_count: usize,
    pub failed_reading_count: usize,
    pub total_reading_count: usize,
}

impl Summary {
    /// Fold per-chain readings into totals.
    ///
    /// `results` must be in registry order; it is what breaks ties when the
    /// breakdown is sorted by value.
    pub fn build(
        address_count: usize,
        results: &[(ChainConfig, Vec<BalanceReading>)],
        price: PriceQuote,
    ) -> Self {
        let chains: Vec<ChainTotal> = results
            .iter()
            .map(|(chain, readings)| ChainTotal::from_readings(chain, readings))
            .collect();

        let mut symbol_totals = BTreeMap::new();
        for chain in &chains {
            *symbol_totals.entry(chain.symbol.clone()).or_insert(0.0) += chain.total;
        }

        let readings = || results.iter().flat_map(|(_, readings)| readings.iter());
        let active_reading_count = readings().filter(|r| r.is_active()).count();
        let failed_reading_count = readings().filter(|r| !r.ok).count();
        let total_reading_count = readings().count();

        let primary_total = symbol_totals
            .get(&price.asset_symbol)
            .copied()
            .unwrap_or(0.0);
        let usd_value = if primary_total <= 0.0 {
            UsdValue::NoBalance
        } else if !price.is_available() {
            UsdValue::PriceUnavailable
        } else {
            UsdValue::Value(primary_total * price.unit_price)
        };

        Self {
            address_count,
            chains,
            symbol_totals,
            price,
            usd_value,
            active_reading_count,
            failed_reading_count,
            total_reading_count,
        }
    }

    /// Total held in the quoted asset across every chain that uses it
    pub fn primary_total(&self) -> f64 {
        self.symbol_totals
            .get(&self.price.asset_symbol)
            .copied()
            .unwrap_or(0.0)
    }

    /// Non-dust chains, largest first; equal totals keep registry order
    pub fn chain_breakdown(&self) -> Vec<&ChainTotal> {
        let mut breakdown: Vec<&ChainTotal> =
            self.chains.iter().filter(|chain| !chain.is_dust()).collect();
        breakdown.sort_by(|a, b| b.total.total_cmp(&a.total));
        breakdown
    }

    /// Non-dust symbol totals in ascending symbol order
    pub fn symbol_breakdown(&self) -> Vec<(&str, f64)> {
        self.symbol_totals
            .iter()
            .filter(|(_, total)| **total >= DUST_THRESHOLD)
            .map(|(symbol, total)| (symbol.as_str(), *total))
            .collect()
    }
}
