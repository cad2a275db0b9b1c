//! Query cache orchestrator
//!
//! Ties the pieces together: derive the key, consult the local store, and
//! on a miss run the warehouse query and store the result. Concurrent
//! misses for the same key collapse into a single warehouse call; misses
//! for different keys proceed fully in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::key::cache_key;
use crate::cache::store::{LocalStore, StoreStats};
use crate::error::{Result, StoreError};
use crate::filter::FilterSet;
use crate::result::TabularResult;
use crate::sql::build_query;
use crate::warehouse::Warehouse;

/// TTL-bound result cache in front of a warehouse.
///
/// The store sits behind its own mutex and is only locked for the duration
/// of a lookup or put, never across the remote call. Per-key flight locks
/// serialize concurrent misses; the map entry is dropped once the last
/// waiter for a key is done.
pub struct QueryCache<W: Warehouse> {
    warehouse: Arc<W>,
    store: Mutex<LocalStore>,
    flights: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    context: String,
}

impl<W: Warehouse> QueryCache<W> {
    /// Create a cache over `warehouse`. The context tag distinguishes the
    /// logical report being cached, so identical filters for different
    /// reports cannot share an entry.
    pub fn new(warehouse: W, context: impl Into<String>) -> Result<Self> {
        Ok(Self::with_store(
            warehouse,
            context,
            LocalStore::open_in_memory()?,
        ))
    }

    /// Create a cache over a pre-configured store (capacity ceiling etc.)
    pub fn with_store(warehouse: W, context: impl Into<String>, store: LocalStore) -> Self {
        Self {
            warehouse: Arc::new(warehouse),
            store: Mutex::new(store),
            flights: Mutex::new(HashMap::new()),
            context: context.into(),
        }
    }

    /// Return the rows for `filters`, from cache when a live entry exists,
    /// otherwise from the warehouse.
    ///
    /// The hit path never touches the warehouse. On a miss the result is
    /// stored with the given TTL before being returned; if storing fails
    /// the fetched rows are still returned and the failure is only logged,
    /// since correct data matters more than caching succeeding.
    pub async fn get(&self, filters: &FilterSet, ttl: Duration) -> Result<TabularResult> {
        let key = cache_key(&self.context, filters);

        if let Some(rows) = self.lookup(&key)? {
            log::debug!("Cache hit: {}", short(&key));
            return Ok(rows);
        }

        let flight = self.flight(&key)?;
        let outcome = {
            let _leader = flight.lock().await;

            // Whoever held the flight lock before us may have stored the
            // result already; re-check before fetching.
            match self.lookup(&key)? {
                Some(rows) => {
                    log::debug!("Cache hit after flight wait: {}", short(&key));
                    Ok(rows)
                }
                None => self.fetch_and_store(&key, filters, ttl).await,
            }
        };
        self.land(&key);
        outcome
    }

    /// Invalidate the entry for `filters`; returns whether a live entry
    /// existed. Expired entries count as absent here, as in `get`.
    pub fn invalidate(&self, filters: &FilterSet) -> Result<bool> {
        let key = cache_key(&self.context, filters);
        let mut store = self.store.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(store.remove(&key)?)
    }

    /// Invalidate every entry, returning how many were dropped
    pub fn clear(&self) -> Result<usize> {
        let mut store = self.store.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(store.clear()?)
    }

    /// Number of entries currently stored
    pub fn size(&self) -> Result<usize> {
        let store = self.store.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(store.size()?)
    }

    /// Store statistics for the operational surface
    pub fn stats(&self) -> Result<StoreStats> {
        let store = self.store.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(store.stats()?)
    }

    async fn fetch_and_store(
        &self,
        key: &str,
        filters: &FilterSet,
        ttl: Duration,
    ) -> Result<TabularResult> {
        let stmt = build_query(filters);
        let started = Instant::now();
        let rows = self.warehouse.execute(&stmt).await?;
        log::debug!(
            "Warehouse fetch for {} returned {} rows in {:?}",
            short(key),
            rows.row_count(),
            started.elapsed()
        );

        let stored: Result<()> = (|| {
            let mut store = self.store.lock().map_err(|_| StoreError::Poisoned)?;
            store.put(key, &stmt.sql, &rows, ttl)?;
            Ok(())
        })();
        if let Err(e) = stored {
            log::warn!("Result for {} not cached: {}", short(key), e);
        }
        Ok(rows)
    }

    fn lookup(&self, key: &str) -> Result<Option<TabularResult>> {
        let mut store = self.store.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(store.lookup(key)?)
    }

    fn flight(&self, key: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut flights = self.flights.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(flights.entry(key.to_string()).or_default().clone())
    }

    /// Drop the flight entry once no other caller holds it (the map's
    /// reference plus ours makes two).
    fn land(&self, key: &str) {
        if let Ok(mut flights) = self.flights.lock()
            && let Some(flight) = flights.get(key)
            && Arc::strong_count(flight) <= 2
        {
            flights.remove(key);
        }
    }
}

fn short(key: &str) -> &str {
    &key[..8.min(key.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RemoteError};
    use crate::filter::FilterField;
    use crate::result::{Column, ColumnType, Value};
    use crate::warehouse::MockWarehouse;

    fn bread_rows() -> TabularResult {
        let mut rows = TabularResult::new(vec![
            Column::new("product", ColumnType::Text),
            Column::new("quantity", ColumnType::Integer),
        ]);
        rows.push_row(vec![Value::Text("bread".to_string()), Value::Integer(1)])
            .unwrap();
        rows.push_row(vec![Value::Text("bread".to_string()), Value::Integer(4)])
            .unwrap();
        rows.push_row(vec![Value::Text("bread".to_string()), Value::Integer(2)])
            .unwrap();
        rows
    }

    fn bread_filters() -> FilterSet {
        FilterSet::new().with(FilterField::Product, "bread").unwrap()
    }

    #[tokio::test]
    async fn test_second_get_is_a_hit() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();
        let filters = bread_filters();

        let first = cache.get(&filters, Duration::from_secs(30)).await.unwrap();
        let second = cache.get(&filters, Duration::from_secs(30)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.row_count(), 3);
        assert_eq!(cache.warehouse.call_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();
        let filters = bread_filters();

        cache.get(&filters, Duration::from_secs(0)).await.unwrap();
        assert_eq!(cache.size().unwrap(), 1);

        cache.get(&filters, Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.warehouse.call_count(), 2);
        assert_eq!(cache.size().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_distinct_filters_cache_separately() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();
        let bread = bread_filters();
        let pies = FilterSet::new()
            .with(FilterField::Product, "Pearly Pies")
            .unwrap();

        cache.get(&bread, Duration::from_secs(30)).await.unwrap();
        cache.get(&pies, Duration::from_secs(30)).await.unwrap();

        assert_eq!(cache.warehouse.call_count(), 2);
        assert_eq!(cache.size().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sends_parameterized_statement() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();

        cache
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap();

        let captured = cache.warehouse.captured();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].sql.contains("product = ?"));
        assert_eq!(captured[0].params, vec!["bread"]);
    }

    #[tokio::test]
    async fn test_single_flight_collapses_concurrent_misses() {
        let warehouse =
            MockWarehouse::with_rows(bread_rows()).with_delay(Duration::from_millis(50));
        let cache = Arc::new(QueryCache::new(warehouse, "sales").unwrap());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.get(&bread_filters(), Duration::from_secs(30)).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(cache.warehouse.call_count(), 1);
        for result in &results {
            assert_eq!(result, &results[0]);
        }
    }

    #[tokio::test]
    async fn test_misses_on_different_keys_run_in_parallel() {
        let warehouse =
            MockWarehouse::with_rows(bread_rows()).with_delay(Duration::from_millis(50));
        let cache = Arc::new(QueryCache::new(warehouse, "sales").unwrap());

        let bread = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(&bread_filters(), Duration::from_secs(30)).await })
        };
        let pies = {
            let cache = Arc::clone(&cache);
            let filters = FilterSet::new()
                .with(FilterField::Product, "Pearly Pies")
                .unwrap();
            tokio::spawn(async move { cache.get(&filters, Duration::from_secs(30)).await })
        };

        bread.await.unwrap().unwrap();
        pies.await.unwrap().unwrap();

        assert_eq!(cache.warehouse.call_count(), 2);
        // Both fetches overlapped inside the warehouse
        assert_eq!(cache.warehouse.max_concurrency(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_propagates_and_stores_nothing() {
        let warehouse = MockWarehouse::with_rows(bread_rows());
        warehouse.fail_next(RemoteError::Timeout);
        let cache = QueryCache::new(warehouse, "sales").unwrap();

        let err = cache
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap_err();
        match err {
            Error::Remote(RemoteError::Timeout) => (),
            other => panic!("Expected timeout, got {:?}", other),
        }
        assert_eq!(cache.size().unwrap(), 0);

        // Next call recovers with a fresh fetch
        let rows = cache
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(rows.row_count(), 3);
        assert_eq!(cache.warehouse.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();
        let filters = bread_filters();

        cache.get(&filters, Duration::from_secs(30)).await.unwrap();
        assert!(cache.invalidate(&filters).unwrap());
        assert!(!cache.invalidate(&filters).unwrap());

        cache.get(&filters, Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.warehouse.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_expired_entry_reports_absent() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();
        let filters = bread_filters();

        cache.get(&filters, Duration::from_secs(0)).await.unwrap();
        assert_eq!(cache.size().unwrap(), 1);

        // Already dead, so there was nothing to invalidate
        assert!(!cache.invalidate(&filters).unwrap());
        assert_eq!(cache.size().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_the_store() {
        let cache = QueryCache::new(MockWarehouse::with_rows(bread_rows()), "sales").unwrap();
        cache
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap();
        let pies = FilterSet::new()
            .with(FilterField::Product, "Pearly Pies")
            .unwrap();
        cache.get(&pies, Duration::from_secs(30)).await.unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.size().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_contexts_do_not_share_entries() {
        let warehouse = MockWarehouse::with_rows(bread_rows());
        let sales = QueryCache::new(warehouse, "sales").unwrap();
        sales
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap();

        let refunds = QueryCache::with_store(
            MockWarehouse::with_rows(bread_rows()),
            "refunds",
            LocalStore::open_in_memory().unwrap(),
        );
        refunds
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap();

        // Each cache fetched once; same filters, different context tags
        assert_eq!(sales.warehouse.call_count(), 1);
        assert_eq!(refunds.warehouse.call_count(), 1);
    }

    #[tokio::test]
    async fn test_capacity_ceiling_applies_through_the_cache() {
        let cache = QueryCache::with_store(
            MockWarehouse::with_rows(bread_rows()),
            "sales",
            LocalStore::with_capacity(1).unwrap(),
        );

        cache
            .get(&bread_filters(), Duration::from_secs(30))
            .await
            .unwrap();
        let pies = FilterSet::new()
            .with(FilterField::Product, "Pearly Pies")
            .unwrap();
        cache.get(&pies, Duration::from_secs(30)).await.unwrap();

        assert_eq!(cache.size().unwrap(), 1);
    }
}
