//! Local result cache for warehouse queries
//!
//! SQLite-backed, TTL-bound, in-process. The orchestrator in
//! [`query_cache`] is the public entry point; [`key`] and [`store`] are the
//! key derivation and storage layers underneath it.

pub mod key;
pub mod query_cache;
pub mod store;

use std::time::Duration;

/// Suggested TTLs per report freshness class.
///
/// The dashboard picks one of these when calling `get`; callers with other
/// needs pass their own duration.
pub struct CacheTtl;

impl CacheTtl {
    /// Live sales views refreshed while someone watches the dashboard
    pub const INTERACTIVE: Duration = Duration::from_secs(5 * 60); // 5 min

    /// Standard report freshness
    pub const REPORT: Duration = Duration::from_secs(30 * 60); // 30 min

    /// Historical slices that effectively never change
    pub const HISTORICAL: Duration = Duration::from_secs(24 * 60 * 60); // 24 hr
}

// Re-export main types
pub use key::cache_key;
pub use query_cache::QueryCache;
pub use store::{LocalStore, StoreStats};
