//! Grievance portal client library.
//!
//! Citizens file complaints, the service classifies and routes them to a
//! department, officers work them through their lifecycle and administrators
//! provision officer accounts. This crate is the client side: a retrying HTTP
//! layer, envelope normalization into typed records, and the session credential.

pub mod api;
pub mod config;
pub mod observability;
pub mod resilience;
pub mod session;

pub use api::{ClientError, ClientResult, GrievanceClient};
pub use config::ClientConfig;
pub use resilience::RetryPolicy;
pub use session::Session;
