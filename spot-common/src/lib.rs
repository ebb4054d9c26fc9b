//! # UrbanSpot Common Library
//!
//! Shared code for the UrbanSpot sync client including:
//! - Entity models (POI, Photo, User, Rating) and write payloads
//! - Identifier normalization for backend records
//! - API credential and error-body types
//! - Current-user watch channel
//! - Configuration loading
//! - Timestamp parsing

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use events::UserWatch;
