//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML)
//!     → loader.rs (read & parse into a generic tree)
//!     → env.rs (replace ${NAME} placeholders in string scalars)
//!     → validation.rs (schema and semantic checks, all errors collected)
//!     → ExporterConfig (validated, immutable)
//!     → shared via Arc with the poller and the HTTP server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Any violation is fatal at startup; no partial config is ever returned
//! - Unset environment variables keep their placeholder text

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigLoader};
pub use schema::{AddressConfig, ExporterConfig, NetworkConfig};
pub use validation::ValidationError;
