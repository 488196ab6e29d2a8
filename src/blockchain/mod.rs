//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! NetworkConfig (rpc_endpoint)
//!     → client.rs (ClientFactory builds a BalanceClient per network)
//!     → eth_getBalance(address, latest)
//!     → U256 balance in wei, or BlockchainError
//! ```
//!
//! # Constraints
//! - Balances stay integers end to end, never floats
//! - Timeouts are enforced by the caller so one slow network cannot stall a cycle
//! - Graceful degradation when an endpoint is unreachable

pub mod client;
pub mod types;

pub use client::{BalanceClient, ClientFactory, RpcBalanceClient, RpcClientFactory};
pub use types::{parse_address, BlockchainError, BlockchainResult};
