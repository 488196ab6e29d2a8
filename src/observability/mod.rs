//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Poller and HTTP server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (cycle and RPC counters, cycle latency)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → /metrics, after the balance series
//! ```

pub mod logging;
pub mod metrics;
