//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resilience / api / session produce:
//!     → logging.rs (structured tracing events, request id as a field)
//!     → metrics.rs (attempt, retry and expiry counters)
//! ```

pub mod logging;
pub mod metrics;
