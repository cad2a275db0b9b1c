//! TTL-bound local result cache for filtered sales queries.
//!
//! `salescache` sits between an interactive client (a dashboard's request
//! handlers, or the bundled CLI) and an expensive remote SQL warehouse.
//! A [`FilterSet`] is hashed into a deterministic cache key; a live entry
//! in the embedded store is replayed without touching the warehouse, and
//! a miss runs the parameterized sales query, stores the rows with an
//! expiration deadline, and returns them. Concurrent misses for the same
//! key collapse into a single warehouse call.
//!
//! ```no_run
//! # async fn example() -> salescache::error::Result<()> {
//! use std::time::Duration;
//! use salescache::{FilterField, FilterSet, QueryCache, WarehouseClient};
//! use salescache::config::Config;
//!
//! let config = Config::load()?;
//! let cache = QueryCache::new(WarehouseClient::new(&config.warehouse)?, "sales")?;
//!
//! let filters = FilterSet::new().with(FilterField::Product, "bread")?;
//! let rows = cache.get(&filters, Duration::from_secs(30)).await?; // warehouse fetch
//! let again = cache.get(&filters, Duration::from_secs(30)).await?; // cache hit
//! # assert_eq!(rows, again);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod result;
pub mod sql;
pub mod warehouse;

pub use cache::{CacheTtl, LocalStore, QueryCache, StoreStats, cache_key};
pub use config::Config;
pub use error::{Error, Result};
pub use filter::{FilterField, FilterSet, FilterValue};
pub use result::{Column, ColumnType, TabularResult, Value};
pub use sql::{SqlStatement, build_query};
pub use warehouse::{Warehouse, WarehouseClient};
