//! Blockchain balance exporter library.
//!
//! Periodically queries account balances over JSON-RPC and exposes them as
//! labeled gauges for Prometheus to scrape.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.yaml ──▶ config ──▶ ExporterConfig (immutable, Arc)
//!                                   │
//!                 ┌─────────────────┴──────────────────┐
//!                 ▼                                    ▼
//!            poller (timer)                       http server
//!   blockchain client ─▶ registry ◀── GET /metrics (auth gate)
//! ```

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod poller;
pub mod registry;

pub use config::{ConfigLoader, ExporterConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use poller::{BalancePoller, PollerHandle};
pub use registry::BalanceRegistry;
