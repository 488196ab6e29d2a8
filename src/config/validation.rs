//! Configuration validation.
//!
//! # Responsibilities
//! - Decode list entries into schema types with serde
//! - Check referential integrity (addresses reference declared networks)
//! - Validate value ranges (interval minimum, timeout below interval)
//! - Keep label values safe for the exposition format
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Each error names the offending field path, e.g. `addresses[1].name`
//! - Runs before the config is accepted into the system

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fmt;

use crate::blockchain::types::parse_address;
use crate::config::env::unresolved_placeholder;
use crate::config::schema::{
    is_label_safe, AddressConfig, ExporterConfig, NetworkConfig, DEFAULT_RPC_TIMEOUT_SECS,
};

const KNOWN_KEYS: &[&str] = &[
    "networks",
    "addresses",
    "update_interval_seconds",
    "rpc_timeout_seconds",
    "static_bearer_token",
];

const LABEL_RULE: &str = "must be label compatible (no spaces, '\"', '{' or '}')";

/// A single schema or invariant violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path of the offending field.
    pub path: String,
    /// Constraint that was violated.
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(path, message));
    }

    /// Decode `value` with serde, recording the failure under `path`.
    fn decode<T: DeserializeOwned>(&mut self, value: &Value, path: &str) -> Option<T> {
        match serde_yaml::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                self.error(path, e.to_string());
                None
            }
        }
    }

    fn required<'a>(&mut self, root: &'a Mapping, key: &str) -> Option<&'a Value> {
        match root.get(key) {
            None | Some(Value::Null) => {
                self.error(key, "field required");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn list(&mut self, root: &Mapping, key: &str) -> Vec<Value> {
        let items: Vec<Value> = self
            .required(root, key)
            .and_then(|value| self.decode(value, key))
            .unwrap_or_default();
        if items.is_empty() && root.get(key).is_some_and(Value::is_sequence) {
            self.error(key, "must contain at least one entry");
        }
        items
    }

    /// Whole seconds, also accepted as a numeric string so the value can come
    /// from a `${NAME}` placeholder.
    fn seconds(&mut self, value: &Value, path: &str) -> Option<u64> {
        let parsed = match value {
            Value::String(s) => s.trim().parse::<u64>().ok(),
            other => serde_yaml::from_value::<u64>(other.clone()).ok(),
        };
        if parsed.is_none() {
            self.error(path, "expected a non-negative integer");
        }
        parsed
    }

    fn network(&mut self, value: &Value, path: &str, seen: &mut HashSet<String>) -> Option<NetworkConfig> {
        // Record every declared name, even for entries rejected below, so
        // references to them are not reported a second time.
        let fresh = match value.get("name").and_then(Value::as_str) {
            Some(name) => seen.insert(name.to_string()),
            None => true,
        };

        let network: NetworkConfig = self.decode(value, path)?;
        let name_path = format!("{path}.name");
        let mut ok = true;
        if network.name.is_empty() {
            self.error(&name_path, "must not be empty");
            ok = false;
        } else if !is_label_safe(&network.name) {
            self.error(&name_path, LABEL_RULE);
            ok = false;
        } else if !fresh {
            self.error(&name_path, format!("duplicate network name '{}'", network.name));
            ok = false;
        }

        if let Err(message) = check_endpoint(&network.rpc_endpoint) {
            self.error(format!("{path}.rpc_endpoint"), message);
            ok = false;
        }

        ok.then_some(network)
    }

    fn address(&mut self, value: &Value, path: &str, networks: &HashSet<String>) -> Option<AddressConfig> {
        let entry: AddressConfig = self.decode(value, path)?;
        let mut ok = true;

        if let Err(e) = parse_address(&entry.address) {
            self.error(format!("{path}.address"), e.to_string());
            ok = false;
        }
        if !is_label_safe(&entry.name) {
            self.error(format!("{path}.name"), LABEL_RULE);
            ok = false;
        }
        if !networks.contains(&entry.network) {
            self.error(
                format!("{path}.network"),
                format!("references undeclared network '{}'", entry.network),
            );
            ok = false;
        }

        ok.then_some(entry)
    }
}

fn check_endpoint(endpoint: &str) -> Result<(), String> {
    if let Some(var) = unresolved_placeholder(endpoint) {
        return Err(format!("environment variable '{var}' is not set"));
    }
    let url = url::Url::parse(endpoint).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported URL scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    Ok(())
}

/// Validate a substituted config tree and build the typed config.
pub fn validate_config(
    root: &Value,
    min_update_interval: u64,
) -> Result<ExporterConfig, Vec<ValidationError>> {
    let mut v = Validator::default();

    let Some(root) = root.as_mapping() else {
        return Err(vec![ValidationError::new("$", "expected a mapping at the top level")]);
    };

    for key in root.keys() {
        let known = key.as_str().is_some_and(|k| KNOWN_KEYS.contains(&k));
        if !known {
            tracing::warn!(key = ?key, "Ignoring unknown configuration key");
        }
    }

    let mut seen = HashSet::new();
    let networks: Vec<_> = v
        .list(root, "networks")
        .iter()
        .enumerate()
        .filter_map(|(i, item)| v.network(item, &format!("networks[{i}]"), &mut seen))
        .collect();

    let addresses: Vec<_> = v
        .list(root, "addresses")
        .iter()
        .enumerate()
        .filter_map(|(i, item)| v.address(item, &format!("addresses[{i}]"), &seen))
        .collect();

    let update_interval_seconds = v
        .required(root, "update_interval_seconds")
        .and_then(|value| v.seconds(value, "update_interval_seconds"))
        .and_then(|secs| {
            if secs < min_update_interval {
                v.error(
                    "update_interval_seconds",
                    format!("must be at least {min_update_interval}"),
                );
                None
            } else {
                Some(secs)
            }
        });

    let rpc_timeout_seconds = match root.get("rpc_timeout_seconds") {
        None | Some(Value::Null) => Some(DEFAULT_RPC_TIMEOUT_SECS),
        Some(value) => v.seconds(value, "rpc_timeout_seconds").and_then(|secs| {
            if secs == 0 {
                v.error("rpc_timeout_seconds", "must be at least 1");
                None
            } else {
                Some(secs)
            }
        }),
    };
    if let (Some(timeout), Some(interval)) = (rpc_timeout_seconds, update_interval_seconds) {
        if timeout >= interval {
            v.error(
                "rpc_timeout_seconds",
                format!("must be smaller than update_interval_seconds ({interval})"),
            );
        }
    }

    let static_bearer_token: Option<String> = match root.get("static_bearer_token") {
        None | Some(Value::Null) => None,
        Some(value) => v.decode(value, "static_bearer_token"),
    };
    if let Some(var) = static_bearer_token.as_deref().and_then(unresolved_placeholder) {
        v.error(
            "static_bearer_token",
            format!("environment variable '{var}' is not set"),
        );
    }

    if !v.errors.is_empty() {
        return Err(v.errors);
    }

    match (update_interval_seconds, rpc_timeout_seconds) {
        (Some(update_interval_seconds), Some(rpc_timeout_seconds)) => Ok(ExporterConfig {
            networks,
            addresses,
            update_interval_seconds,
            rpc_timeout_seconds,
            static_bearer_token,
        }),
        _ => Err(vec![ValidationError::new("$", "incomplete configuration")]),
    }
}
