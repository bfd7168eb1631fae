//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical API operation:
//!     → retries.rs (send, inspect status or transport error)
//!     → backoff.rs (delay = base * 2^attempt)
//!     → sleep, send again, until final outcome or retries exhausted
//! ```

pub mod backoff;
pub mod retries;

pub use retries::{HasStatus, RetryPolicy};
