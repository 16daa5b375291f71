use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use alloy::primitives::{hex, Address};
use regex::Regex;
use serde::{Serialize, Serializer};

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[0-9a-fA-F]{40}").expect("address pattern is valid"));

/// A 20-byte EVM account address.
///
/// Displays as lowercase hex with a `0x` prefix, which is also its identity:
/// spellings that only differ in letter case are the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(Address);

impl WalletAddress {
    pub fn as_address(&self) -> Address {
        self.0
    }
}

impl From<Address> for WalletAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for WalletAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Address::from_str(s)?))
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Pull every address out of free-form text.
///
/// Candidates are `0x` followed by exactly 40 hex digits; a candidate that
/// runs into a 41st hex digit is skipped, unless that digit starts the next
/// `0x` prefix. The result keeps the order of first occurrence and drops
/// case-insensitive duplicates.
pub fn extract_addresses(text: &str) -> Vec<WalletAddress> {
    let mut addresses = Vec::new();
    let mut seen = HashSet::new();

    for candidate in ADDRESS_PATTERN.find_iter(text) {
        if runs_into_hex(&text[candidate.end()..]) {
            continue;
        }

        let Ok(address) = candidate.as_str().parse::<WalletAddress>() else {
            continue;
        };
        if seen.insert(address) {
            addresses.push(address);
        }
    }

    addresses
}

fn runs_into_hex(rest: &str) -> bool {
    let starts_prefix = rest.starts_with("0x") || rest.starts_with("0X");
    !starts_prefix && rest.starts_with(|c: char| c.is_ascii_hexdigit())
}
