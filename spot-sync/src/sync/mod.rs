//! Collection synchronization
//!
//! Turns a backend that only returns bounded pages into complete views:
//! - [`pagination`] walks a paginated list to its end
//! - [`aggregate`] fans out child fetches over a parent set and merges them
//!
//! Both absorb individual request failures, returning what they could
//! gather instead of an error.

pub mod aggregate;
pub mod pagination;

pub use aggregate::aggregate_children;
pub use pagination::{fetch_all, fetch_all_pages, FetchedCollection};
