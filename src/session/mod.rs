//! Client session subsystem.
//!
//! # Responsibilities
//! - Hold the single bearer credential for the process
//! - Persist it across restarts (file) or keep it in memory only
//! - Define the points where it changes: establish, sign-out, expiry

pub mod state;
pub mod store;

pub use state::Session;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
