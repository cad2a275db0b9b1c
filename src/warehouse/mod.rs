//! Remote warehouse boundary
//!
//! The cache only needs one thing from the warehouse: execute a statement
//! with its bound parameters and hand back typed rows. Everything behind
//! that (transport, auth, retries) is the client's business.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::result::TabularResult;
use crate::sql::SqlStatement;

pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::WarehouseClient;
#[cfg(test)]
pub use mock::MockWarehouse;

/// Executes SQL against the upstream warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Run `stmt` and return its rows with column metadata.
    ///
    /// Implementations are expected to enforce their own request timeout
    /// and surface it as [`RemoteError::Timeout`].
    async fn execute(&self, stmt: &SqlStatement) -> Result<TabularResult, RemoteError>;
}
