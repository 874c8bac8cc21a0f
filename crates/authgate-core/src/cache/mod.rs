//! In-memory caching of API query results.
//!
//! This module provides the `QueryCache` used by `api::Queries`. Entries are
//! served while younger than a fixed stale time (10 seconds by default).

pub mod query;

pub use query::{CachedData, QueryCache};
