use alloy::primitives::U256;

use crate::address::WalletAddress;

/// Represents a native balance with its raw amount and decimals
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub token: String,
    pub raw: U256,
    pub decimals: u8,
    pub formatted: String,
}

impl Balance {
    pub fn new(token: String, raw: U256, decimals: u8) -> Self {
        let formatted = format_balance(raw, decimals);
        Self {
            token,
            raw,
            decimals,
            formatted,
        }
    }

    /// Balance in whole-token units
    pub fn amount(&self) -> f64 {
        let (whole, fractional) = split_units(self.raw, self.decimals);
        f64::from(whole) + f64::from(fractional) / 10f64.powi(i32::from(self.decimals))
    }
}

/// Outcome of one (chain, address) balance lookup.
///
/// A failed lookup keeps its chain and address but reports a zero amount.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReading {
    pub chain_id: String,
    pub address: WalletAddress,
    pub amount: f64,
    pub raw: Option<U256>,
    pub ok: bool,
}

impl BalanceReading {
    pub fn from_balance(chain_id: &str, address: WalletAddress, balance: &Balance) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            address,
            amount: balance.amount(),
            raw: Some(balance.raw),
            ok: true,
        }
    }

    pub fn failed(chain_id: &str, address: WalletAddress) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            address,
            amount: 0.0,
            raw: None,
            ok: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ok && self.amount > 0.0
    }
}

/// Whole units and the remainder in smallest units
fn split_units(value: U256, decimals: u8) -> (U256, U256) {
    let divisor = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .unwrap_or(U256::MAX);
    (value / divisor, value % divisor)
}

/// Format balance with proper decimal places
fn format_balance(value: U256, decimals: u8) -> String {
    let (whole, fractional) = split_units(value, decimals);

    if fractional.is_zero() {
        format!("{}", whole)
    } else {
        let frac_str = format!("{:0>width$}", fractional.to_string(), width = decimals as usize);
        let trimmed = frac_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}
