//! Mock warehouse for testing
//!
//! Returns canned rows, counts calls, and can inject failures and latency
//! so cache behavior is testable without a live warehouse.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::RemoteError;
use crate::result::TabularResult;
use crate::sql::SqlStatement;
use crate::warehouse::Warehouse;

/// Mock warehouse.
///
/// Configure canned rows and optional latency at construction; inject a
/// one-shot failure with [`fail_next`](Self::fail_next). Call counts and
/// captured statements support test assertions.
pub struct MockWarehouse {
    rows: Mutex<TabularResult>,
    error: Mutex<Option<RemoteError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
    captured: Mutex<Vec<SqlStatement>>,
}

impl MockWarehouse {
    pub fn with_rows(rows: TabularResult) -> Self {
        Self {
            rows: Mutex::new(rows),
            error: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
            concurrent: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every `execute` call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `execute` call with `err`; consumed on first use
    pub fn fail_next(&self, err: RemoteError) {
        *self.error.lock().unwrap() = Some(err);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `execute` calls observed in flight at once
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<SqlStatement> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn execute(&self, stmt: &SqlStatement) -> Result<TabularResult, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent
            .fetch_max(now_in_flight, Ordering::SeqCst);
        self.captured.lock().unwrap().push(stmt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.concurrent.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}
