//! Background balance polling.
//!
//! # Data Flow
//! ```text
//! timer tick (scheduler.rs)
//!     → BalancePoller::run_once
//!         for network in config order:
//!             → cached or fresh BalanceClient
//!             for address on that network, in config order:
//!                 → get_balance with per-call timeout
//!                 → Ok: registry.set(labels, balance)
//!                 → Err: warn, keep previous value, continue
//! ```
//!
//! # Design Decisions
//! - One address failing never aborts the cycle
//! - A failed query leaves the existing registry entry untouched
//! - Clients are reused across cycles; a failed build is retried next cycle
//! - Cycles never overlap: a second `run_once` while one is running is skipped

pub mod scheduler;

use alloy::primitives::U256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::blockchain::{parse_address, BalanceClient, BlockchainError, BlockchainResult, ClientFactory};
use crate::config::{AddressConfig, ExporterConfig, NetworkConfig};
use crate::observability::metrics;
use crate::registry::{BalanceLabels, BalanceRegistry};

pub use scheduler::PollerHandle;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Addresses whose balance was written to the registry.
    pub updated: usize,
    /// Addresses whose query failed.
    pub failed: usize,
    /// True when the cycle did not run because another was in progress.
    pub skipped: bool,
}

/// Queries every configured address and records the results.
pub struct BalancePoller {
    config: Arc<ExporterConfig>,
    registry: BalanceRegistry,
    factory: Arc<dyn ClientFactory>,
    rpc_timeout: Duration,
    // Doubles as the cycle lock.
    clients: Mutex<HashMap<String, Arc<dyn BalanceClient>>>,
}

impl BalancePoller {
    pub fn new(
        config: Arc<ExporterConfig>,
        registry: BalanceRegistry,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let rpc_timeout = Duration::from_secs(config.rpc_timeout_seconds);
        Self {
            config,
            registry,
            factory,
            rpc_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-call timeout taken from the config.
    pub fn with_rpc_timeout(mut self, rpc_timeout: Duration) -> Self {
        self.rpc_timeout = rpc_timeout;
        self
    }

    pub fn registry(&self) -> &BalanceRegistry {
        &self.registry
    }

    /// Run exactly one poll cycle.
    pub async fn run_once(&self) -> CycleReport {
        let start = Instant::now();
        let Ok(mut clients) = self.clients.try_lock() else {
            tracing::warn!("Previous poll cycle still running, skipping");
            metrics::record_cycle("skipped", start);
            return CycleReport {
                skipped: true,
                ..CycleReport::default()
            };
        };

        let mut report = CycleReport::default();
        for network in &self.config.networks {
            let client = match clients.get(&network.name) {
                Some(client) => client.clone(),
                None => match self.factory.connect(network) {
                    Ok(client) => {
                        clients.insert(network.name.clone(), client.clone());
                        client
                    }
                    Err(e) => {
                        for entry in self.config.addresses_for(&network.name) {
                            self.record_failure(network, entry, &e);
                            report.failed += 1;
                        }
                        continue;
                    }
                },
            };

            for entry in self.config.addresses_for(&network.name) {
                match self.query(client.as_ref(), entry).await {
                    Ok(balance) => {
                        self.registry.set(
                            BalanceLabels::new(&entry.address, &entry.name, &network.name),
                            balance,
                        );
                        metrics::record_rpc(&network.name, true);
                        tracing::info!(
                            address_name = %entry.name,
                            address = %entry.address,
                            network = %network.name,
                            balance = %balance,
                            "Updated balance"
                        );
                        report.updated += 1;
                    }
                    Err(e) => {
                        self.record_failure(network, entry, &e);
                        report.failed += 1;
                    }
                }
            }
        }

        let outcome = if report.failed == 0 { "ok" } else { "partial" };
        metrics::record_cycle(outcome, start);
        tracing::debug!(
            updated = report.updated,
            failed = report.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Poll cycle finished"
        );
        report
    }

    async fn query(&self, client: &dyn BalanceClient, entry: &AddressConfig) -> BlockchainResult<U256> {
        let address = parse_address(&entry.address)?;
        timeout(self.rpc_timeout, client.get_balance(address))
            .await
            .map_err(|_| BlockchainError::Timeout(self.rpc_timeout.as_secs()))?
    }

    fn record_failure(&self, network: &NetworkConfig, entry: &AddressConfig, error: &BlockchainError) {
        metrics::record_rpc(&network.name, false);
        tracing::warn!(
            address_name = %entry.name,
            address = %entry.address,
            network = %network.name,
            error = %error,
            "Failed to update balance"
        );
    }
}
