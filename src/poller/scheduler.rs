//! Periodic scheduling of poll cycles.
//!
//! The first cycle runs immediately. Later cycles follow the interval timer.
//! Ticks that fall inside a cycle that is still running are skipped, not
//! queued.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::Shutdown;
use crate::poller::BalancePoller;

/// Owned handle to a running poller task.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller to stop and wait up to `grace` for it.
    ///
    /// An in-flight cycle is cancelled at its next suspension point. If the
    /// task has not finished when the grace period ends it is aborted.
    pub async fn stop(mut self, grace: Duration) {
        self.shutdown.trigger();
        match time::timeout(grace, &mut self.task).await {
            Ok(Ok(())) => tracing::info!("Balance poller stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Balance poller task failed"),
            Err(_) => {
                tracing::warn!(grace_ms = grace.as_millis() as u64, "Balance poller did not stop in time, aborting");
                self.task.abort();
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl BalancePoller {
    /// Run a cycle now and then every `interval` until the handle is stopped.
    pub fn start(self: Arc<Self>, interval: Duration) -> PollerHandle {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let task = tokio::spawn(run_loop(self, interval, rx));
        tracing::info!(interval_secs = interval.as_secs(), "Balance poller started");
        PollerHandle { shutdown, task }
    }
}

async fn run_loop(poller: Arc<BalancePoller>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::info!("Shutdown requested during poll cycle, abandoning it");
                break;
            }
            _ = poller.run_once() => {}
        }

        let elapsed = started.elapsed();
        if elapsed > interval {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "Poll cycle overran its interval, skipping missed ticks"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BalanceClient, BlockchainResult, ClientFactory};
    use crate::config::{AddressConfig, ExporterConfig, NetworkConfig};
    use crate::registry::BalanceRegistry;
    use alloy::primitives::{Address, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl BalanceClient for CountingClient {
        async fn get_balance(&self, _address: Address) -> BlockchainResult<U256> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(U256::from(n as u64))
        }
    }

    struct CountingFactory {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ClientFactory for CountingFactory {
        fn connect(&self, _network: &NetworkConfig) -> BlockchainResult<Arc<dyn BalanceClient>> {
            Ok(Arc::new(CountingClient {
                calls: self.calls.clone(),
                delay: self.delay,
            }))
        }
    }

    fn config() -> Arc<ExporterConfig> {
        Arc::new(ExporterConfig {
            networks: vec![NetworkConfig {
                name: "mainnet".into(),
                rpc_endpoint: "http://node.example".into(),
            }],
            addresses: vec![AddressConfig {
                address: "0x0000000000000000000000000000000000000001".into(),
                name: "wallet1".into(),
                network: "mainnet".into(),
            }],
            update_interval_seconds: 60,
            rpc_timeout_seconds: 10,
            static_bearer_token: None,
        })
    }

    fn poller(calls: Arc<AtomicUsize>, delay: Duration) -> Arc<BalancePoller> {
        Arc::new(BalancePoller::new(
            config(),
            BalanceRegistry::new(),
            Arc::new(CountingFactory { calls, delay }),
        ))
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = poller(calls.clone(), Duration::ZERO).start(Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        handle.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_runs_periodically_until_stopped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = poller(calls.clone(), Duration::ZERO).start(Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.stop(Duration::from_secs(1)).await;
        let seen = calls.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected several cycles, saw {seen}");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    struct TrackingClient {
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BalanceClient for TrackingClient {
        async fn get_balance(&self, _address: Address) -> BlockchainResult<U256> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(120)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(U256::ZERO)
        }
    }

    struct TrackingFactory(Arc<TrackingClient>);

    impl ClientFactory for TrackingFactory {
        fn connect(&self, _network: &NetworkConfig) -> BlockchainResult<Arc<dyn BalanceClient>> {
            Ok(self.0.clone() as Arc<dyn BalanceClient>)
        }
    }

    #[tokio::test]
    async fn test_overrunning_cycles_are_not_queued() {
        let client = Arc::new(TrackingClient {
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        });
        let poller = Arc::new(BalancePoller::new(
            config(),
            BalanceRegistry::new(),
            Arc::new(TrackingFactory(client.clone())),
        ));

        // Each cycle takes 120ms against a 50ms interval.
        let handle = poller.start(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(450)).await;
        handle.stop(Duration::from_secs(1)).await;

        let calls = client.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected the loop to keep running, saw {calls}");
        assert!(calls <= 4, "missed ticks were replayed: {calls} cycles");
        assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_does_not_hang_on_slow_rpc() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = poller(calls.clone(), Duration::from_secs(30)).start(Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        handle.stop(Duration::from_secs(2)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
