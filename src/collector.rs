use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::address::WalletAddress;
use crate::chain::ChainProvider;
use crate::config::{ChainConfig, Limits};
use crate::types::BalanceReading;

/// Batching parameters for one chain's collection run
#[derive(Debug, Clone, Copy)]
pub struct CollectorSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Limits::default().into()
    }
}

impl From<Limits> for CollectorSettings {
    fn from(limits: Limits) -> Self {
        Self::from(&limits)
    }
}

impl From<&Limits> for CollectorSettings {
    fn from(limits: &Limits) -> Self {
        Self {
            batch_size: limits.batch_size.max(1),
            batch_delay: limits.batch_delay(),
        }
    }
}

/// Fetch the native balance of every address on one chain.
///
/// Addresses are queried in batches: a batch runs concurrently, batches run
/// one after another with `batch_delay` between them. A failed lookup becomes
/// a zero reading with `ok = false` and is not retried. Readings come back in
/// input order.
#[instrument(skip_all, fields(chain = %chain.id, addresses = addresses.len()))]
pub async fn collect_chain_balances(
    chain: &ChainConfig,
    provider: &dyn ChainProvider,
    addresses: &[WalletAddress],
    settings: CollectorSettings,
) -> Vec<BalanceReading> {
    let mut readings = Vec::with_capacity(addresses.len());
    let batch_size = settings.batch_size.max(1);
    let batch_count = addresses.len().div_ceil(batch_size);

    for (index, batch) in addresses.chunks(batch_size).enumerate() {
        let lookups = batch.iter().map(|address| async move {
            match provider.get_native_balance(address).await {
                Ok(balance) => BalanceReading::from_balance(&chain.id, *address, &balance),
                Err(e) => {
                    warn!(chain = %chain.id, %address, "balance lookup failed: {e:#}");
                    BalanceReading::failed(&chain.id, *address)
                }
            }
        });
        readings.extend(join_all(lookups).await);
        debug!(batch = index + 1, of = batch_count, "batch complete");

        if index + 1 < batch_count && !settings.batch_delay.is_zero() {
            tokio::time::sleep(settings.batch_delay).await;
        }
    }

    readings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Balance;
    use alloy::primitives::U256;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Returns one wei per leading `0x11` byte, fails for addresses starting with `0xff`
    struct ScriptedProvider {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        seen: Mutex<Vec<WalletAddress>>,
    }

    impl ScriptedProvider {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainProvider for ScriptedProvider {
        async fn get_native_balance(&self, address: &WalletAddress) -> Result<Balance> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(*address);

            let first = address.as_address().0[0];
            if first == 0xff {
                return Err(anyhow!("rpc unavailable"));
            }
            Ok(Balance::new("ETH".to_string(), U256::from(first), 0))
        }
    }

    fn chain() -> ChainConfig {
        crate::config::Config::load().unwrap().chains[0].clone()
    }

    fn addresses(count: usize) -> Vec<WalletAddress> {
        (0..count)
            .map(|i| {
                let first = if i % 5 == 4 { 0xff } else { (i % 200) as u8 };
                let mut bytes = [0u8; 20];
                bytes[0] = first;
                bytes[19] = i as u8;
                WalletAddress::from(alloy::primitives::Address::from(bytes))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_readings_keep_input_order() {
        let provider = ScriptedProvider::new(Duration::from_millis(1));
        let input = addresses(23);
        let settings = CollectorSettings {
            batch_size: 10,
            batch_delay: Duration::ZERO,
        };

        let readings = collect_chain_balances(&chain(), &provider, &input, settings).await;

        let order: Vec<WalletAddress> = readings.iter().map(|r| r.address).collect();
        assert_eq!(order, input);
        assert!(readings.iter().all(|r| r.chain_id == "ethereum"));
    }

    #[tokio::test]
    async fn test_failures_become_zero_readings() {
        let provider = ScriptedProvider::new(Duration::ZERO);
        let input = addresses(10);

        let readings =
            collect_chain_balances(&chain(), &provider, &input, CollectorSettings::default()).await;

        let failed: Vec<&BalanceReading> = readings.iter().filter(|r| !r.ok).collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|r| r.amount == 0.0 && r.raw.is_none()));
        assert_eq!(readings[1].amount, 1.0);
        assert!(readings[1].ok);
    }

    #[tokio::test]
    async fn test_batches_bound_concurrency() {
        let provider = ScriptedProvider::new(Duration::from_millis(20));
        let input = addresses(25);
        let settings = CollectorSettings {
            batch_size: 10,
            batch_delay: Duration::from_millis(10),
        };

        let started = Instant::now();
        let readings = collect_chain_balances(&chain(), &provider, &input, settings).await;
        let elapsed = started.elapsed();

        assert_eq!(readings.len(), 25);
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 10);
        assert_eq!(provider.seen.lock().unwrap().len(), 25);
        // three batches of ~20ms plus two pacing delays
        assert!(elapsed >= Duration::from_millis(80), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_empty_address_list() {
        let provider = ScriptedProvider::new(Duration::ZERO);
        let readings =
            collect_chain_balances(&chain(), &provider, &[], CollectorSettings::default()).await;
        assert!(readings.is_empty());
    }
}
