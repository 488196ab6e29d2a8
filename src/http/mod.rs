//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → auth.rs (static bearer token, when configured)
//!     → /metrics handler (registry dump + exporter metrics)
//!     → Send to client
//! ```

pub mod auth;
pub mod server;

pub use auth::{AuthGate, AuthRejection};
pub use server::{build_router, AppContext, HttpServer};
