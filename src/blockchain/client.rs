//! Blockchain RPC clients used by the balance poller.
//!
//! # Responsibilities
//! - Connect to a network's JSON-RPC endpoint
//! - Query the latest native balance of an address
//! - Report every failure as a `BlockchainError` so callers can treat
//!   construction and call failures the same way

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::NetworkConfig;

/// Something that can report the balance of an account.
#[async_trait]
pub trait BalanceClient: Send + Sync {
    /// Latest balance of `address`, in the chain's smallest unit.
    async fn get_balance(&self, address: Address) -> BlockchainResult<U256>;
}

/// Builds a client bound to one network.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, network: &NetworkConfig) -> BlockchainResult<Arc<dyn BalanceClient>>;
}

/// JSON-RPC client backed by an alloy HTTP provider.
#[derive(Clone)]
pub struct RpcBalanceClient {
    provider: Arc<dyn Provider + Send + Sync>,
    endpoint: String,
}

impl RpcBalanceClient {
    /// Create a client for `endpoint`. No request is made until the first query.
    pub fn new(endpoint: &str) -> BlockchainResult<Self> {
        let url: url::Url = endpoint.parse().map_err(|e: url::ParseError| {
            BlockchainError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;
        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BalanceClient for RpcBalanceClient {
    async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| BlockchainError::Rpc(e.to_string()))
    }
}

impl std::fmt::Debug for RpcBalanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcBalanceClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Default factory producing [`RpcBalanceClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcClientFactory;

impl ClientFactory for RpcClientFactory {
    fn connect(&self, network: &NetworkConfig) -> BlockchainResult<Arc<dyn BalanceClient>> {
        let client = RpcBalanceClient::new(&network.rpc_endpoint)?;
        tracing::debug!(
            network = %network.name,
            rpc_endpoint = %client.endpoint(),
            "RPC client initialized"
        );
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(endpoint: &str) -> NetworkConfig {
        NetworkConfig {
            name: "mainnet".to_string(),
            rpc_endpoint: endpoint.to_string(),
        }
    }

    #[tokio::test]
    async fn test_client_creation() {
        // Creation is lazy and succeeds even if nothing listens there
        let client = RpcBalanceClient::new("http://localhost:8545").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8545");
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = RpcClientFactory.connect(&network("not a url"));
        assert!(matches!(result, Err(BlockchainError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let client = RpcClientFactory.connect(&network("http://127.0.0.1:1")).unwrap();
        let result = client.get_balance(Address::ZERO).await;
        assert!(matches!(result, Err(BlockchainError::Rpc(_))));
    }
}
