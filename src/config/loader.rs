//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::env::substitute_env;
use crate::config::schema::ExporterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Smallest accepted `update_interval_seconds` unless overridden.
pub const DEFAULT_MIN_UPDATE_INTERVAL_SECS: u64 = 60;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    /// Individual violations, empty for IO and parse failures.
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            ConfigError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

/// Reads, substitutes and validates exporter configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    min_update_interval: u64,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            min_update_interval: DEFAULT_MIN_UPDATE_INTERVAL_SECS,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the smallest accepted update interval.
    pub fn with_min_update_interval(mut self, secs: u64) -> Self {
        self.min_update_interval = secs;
        self
    }

    /// Load and validate configuration from a YAML file.
    pub fn load(&self, path: &Path) -> Result<ExporterConfig, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_from_slice(&bytes)
    }

    /// Load and validate configuration from raw YAML bytes.
    pub fn load_from_slice(&self, bytes: &[u8]) -> Result<ExporterConfig, ConfigError> {
        let tree: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
        let tree = substitute_env(tree);
        validate_config(&tree, self.min_update_interval).map_err(ConfigError::Validation)
    }
}

/// Load configuration from `path` with default loader settings.
pub fn load_config(path: &Path) -> Result<ExporterConfig, ConfigError> {
    ConfigLoader::new().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
networks:
  - name: mainnet
    rpc_endpoint: "http://${BALANCE_EXPORTER_TEST_HOST}"
addresses:
  - address: "0x0000000000000000000000000000000000000001"
    name: wallet1
    network: mainnet
update_interval_seconds: 60
static_bearer_token: "${BALANCE_EXPORTER_TEST_TOKEN}"
"#;

    #[test]
    fn test_load_substitutes_environment() {
        std::env::set_var("BALANCE_EXPORTER_TEST_HOST", "node.example");
        std::env::set_var("BALANCE_EXPORTER_TEST_TOKEN", "s3cret");

        let config = ConfigLoader::new().load_from_slice(CONFIG.as_bytes()).unwrap();
        assert_eq!(config.networks[0].rpc_endpoint, "http://node.example");
        assert_eq!(config.static_bearer_token.as_deref(), Some("s3cret"));
        assert_eq!(config.addresses[0].name, "wallet1");
    }

    #[test]
    fn test_load_intervals_from_environment() {
        std::env::set_var("BALANCE_EXPORTER_TEST_INTERVAL", "120");
        std::env::set_var("BALANCE_EXPORTER_TEST_RPC_TIMEOUT", "20");

        let raw = CONFIG
            .replace("${BALANCE_EXPORTER_TEST_HOST}", "node.example")
            .replace("${BALANCE_EXPORTER_TEST_TOKEN}", "t")
            .replace(
                "update_interval_seconds: 60",
                "update_interval_seconds: ${BALANCE_EXPORTER_TEST_INTERVAL}\nrpc_timeout_seconds: \"${BALANCE_EXPORTER_TEST_RPC_TIMEOUT}\"",
            );
        let config = ConfigLoader::new().load_from_slice(raw.as_bytes()).unwrap();
        assert_eq!(config.update_interval_seconds, 120);
        assert_eq!(config.rpc_timeout_seconds, 20);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("balance-exporter-{}.yaml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(
            CONFIG
                .replace("${BALANCE_EXPORTER_TEST_HOST}", "localhost:8545")
                .replace("${BALANCE_EXPORTER_TEST_TOKEN}", "abc")
                .as_bytes(),
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.networks[0].rpc_endpoint, "http://localhost:8545");
        assert_eq!(config.static_bearer_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.violations().is_empty());
    }

    #[test]
    fn test_malformed_yaml() {
        let err = ConfigLoader::new()
            .load_from_slice(b"networks: [unclosed")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_every_violation() {
        let raw = CONFIG
            .replace("${BALANCE_EXPORTER_TEST_HOST}", "node.example")
            .replace("name: wallet1", "name: \"wallet 1\"")
            .replace("update_interval_seconds: 60", "update_interval_seconds: 30");
        let err = ConfigLoader::new().load_from_slice(raw.as_bytes()).unwrap_err();

        let paths: Vec<_> = err.violations().iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"addresses[0].name"));
        assert!(paths.contains(&"update_interval_seconds"));
        assert!(err.to_string().contains("addresses[0].name"));
    }

    #[test]
    fn test_min_interval_override() {
        let raw = CONFIG
            .replace("${BALANCE_EXPORTER_TEST_HOST}", "node.example")
            .replace("${BALANCE_EXPORTER_TEST_TOKEN}", "t")
            .replace("update_interval_seconds: 60", "update_interval_seconds: 15");

        assert!(ConfigLoader::new().load_from_slice(raw.as_bytes()).is_err());
        let config = ConfigLoader::new()
            .with_min_update_interval(15)
            .load_from_slice(raw.as_bytes())
            .unwrap();
        assert_eq!(config.update_interval_seconds, 15);
    }
}
