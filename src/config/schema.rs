//! Configuration schema definitions.
//!
//! List entries are decoded with serde and then checked by the validator, so
//! every instance the loader returns satisfies the invariants documented on
//! its fields.

use serde::Deserialize;

/// Default per-call RPC timeout in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Validated exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Networks to poll, in declaration order. Never empty.
    pub networks: Vec<NetworkConfig>,

    /// Watched addresses, in declaration order. Never empty.
    pub addresses: Vec<AddressConfig>,

    /// Seconds between poll cycles.
    pub update_interval_seconds: u64,

    /// Per-call RPC timeout, strictly below the update interval.
    pub rpc_timeout_seconds: u64,

    /// Bearer token required on every HTTP request, if set.
    pub static_bearer_token: Option<String>,
}

/// A JSON-RPC network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkConfig {
    /// Unique, label-safe network name.
    pub name: String,

    /// JSON-RPC over HTTP endpoint.
    pub rpc_endpoint: String,
}

/// A watched account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddressConfig {
    /// Account address as written in the config file.
    pub address: String,

    /// Label-safe display name.
    pub name: String,

    /// Name of the network this address lives on.
    pub network: String,
}

impl ExporterConfig {
    /// Addresses bound to `network`, in declaration order.
    pub fn addresses_for<'a>(
        &'a self,
        network: &'a str,
    ) -> impl Iterator<Item = &'a AddressConfig> + 'a {
        self.addresses.iter().filter(move |a| a.network == network)
    }
}

/// Returns true when `value` can be used verbatim as a metric label value.
pub fn is_label_safe(value: &str) -> bool {
    !value.contains([' ', '"', '{', '}'])
}
