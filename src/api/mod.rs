//! Grievance portal API subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → client.rs (validate input, build request, attach credential)
//!     → resilience::RetryPolicy (attempts + backoff)
//!     → envelope.rs (nested/flat envelope → internal types)
//!     → types.rs values, or error.rs ClientError
//! ```

pub mod client;
pub mod envelope;
pub mod error;
pub mod types;

pub use client::GrievanceClient;
pub use error::{ClientError, ClientResult};
pub use types::{
    Classification, Complaint, ComplaintDraft, ComplaintStatus, DashboardStats, HealthStatus,
    Notification, OfficerDraft, Priority, Registration, Sentiment, User, UserRole,
};
