//! Shared HTTP API types
//!
//! Contains ONLY framework-free pieces used by the sync client:
//! - The API key credential attached to every request
//! - Backend error body parsing

pub mod auth;
pub mod types;

pub use auth::{ApiKey, API_KEY_HEADER};
pub use types::ErrorBody;
