//! HTTP client for the warehouse's statement execution API
//!
//! Submits the statement plus ordered bind parameters as JSON and decodes
//! the manifest/rows from the response. All transport, auth, and query
//! failures surface as [`RemoteError`]; the cache treats them uniformly.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::WarehouseConfig;
use crate::error::RemoteError;
use crate::result::{Column, ColumnType, TabularResult, Value};
use crate::sql::SqlStatement;
use crate::warehouse::Warehouse;

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";

/// Warehouse client speaking the statement execution REST API
pub struct WarehouseClient {
    http: reqwest::Client,
    base_url: String,
    warehouse_id: String,
    token: String,
}

impl WarehouseClient {
    /// Build a client from configuration. The request timeout bounds the
    /// whole statement round trip; hitting it is reported as a timeout.
    pub fn new(config: &WarehouseConfig) -> Result<Self, RemoteError> {
        Self::from_parts(
            config.host.clone(),
            config.warehouse_id.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Build a client against an explicit base URL (used by tests)
    pub fn from_parts(
        base_url: String,
        warehouse_id: String,
        token: String,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::from)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            warehouse_id,
            token,
        })
    }
}

#[async_trait]
impl Warehouse for WarehouseClient {
    async fn execute(&self, stmt: &SqlStatement) -> Result<TabularResult, RemoteError> {
        let url = format!("{}{}", self.base_url, STATEMENTS_PATH);
        let body = serde_json::json!({
            "warehouse_id": self.warehouse_id,
            "statement": stmt.sql,
            "parameters": stmt.params,
            "wait_timeout": "30s",
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RemoteError::Query(format!("HTTP {}: {}", status, detail)));
        }

        let payload: StatementResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        decode_response(payload)
    }
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    status: StatementStatus,
    manifest: Option<Manifest>,
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: ManifestSchema,
}

#[derive(Debug, Deserialize)]
struct ManifestSchema {
    columns: Vec<ManifestColumn>,
}

#[derive(Debug, Deserialize)]
struct ManifestColumn {
    name: String,
    type_name: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Vec<serde_json::Value>>,
}

fn decode_response(payload: StatementResponse) -> Result<TabularResult, RemoteError> {
    match payload.status.state.as_str() {
        "SUCCEEDED" => (),
        "FAILED" | "CANCELED" | "CLOSED" => {
            let message = payload
                .status
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| payload.status.state.clone());
            return Err(RemoteError::Query(message));
        }
        other => {
            return Err(RemoteError::InvalidResponse(format!(
                "unexpected statement state {:?}",
                other
            )));
        }
    }

    let manifest = payload
        .manifest
        .ok_or_else(|| RemoteError::InvalidResponse("missing manifest".to_string()))?;
    let schema: Vec<Column> = manifest
        .schema
        .columns
        .into_iter()
        .map(|c| Column::new(c.name, column_type(&c.type_name)))
        .collect();

    let mut result = TabularResult::new(schema);
    let data = payload.result.map(|r| r.data_array).unwrap_or_default();
    for raw_row in data {
        let mut row = Vec::with_capacity(result.schema().len());
        if raw_row.len() != result.schema().len() {
            return Err(RemoteError::InvalidResponse(format!(
                "row has {} cells, schema has {} columns",
                raw_row.len(),
                result.schema().len()
            )));
        }
        for (cell, column) in raw_row.into_iter().zip(result.schema()) {
            row.push(decode_cell(cell, column)?);
        }
        result
            .push_row(row)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
    }
    Ok(result)
}

/// Map the warehouse's type names onto the cache's value types. Anything
/// unrecognized degrades to text rather than failing the fetch.
fn column_type(type_name: &str) -> ColumnType {
    match type_name.to_uppercase().as_str() {
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "LONG" => ColumnType::Integer,
        "FLOAT" | "DOUBLE" | "REAL" | "DECIMAL" => ColumnType::Real,
        "BOOLEAN" | "BOOL" => ColumnType::Boolean,
        _ => ColumnType::Text,
    }
}

fn decode_cell(cell: serde_json::Value, column: &Column) -> Result<Value, RemoteError> {
    use serde_json::Value as Json;

    let value = match (cell, column.ty) {
        (Json::Null, _) => Value::Null,
        (Json::String(s), ColumnType::Text) => Value::Text(s),
        // JSON-transported numerics may arrive as strings; accept both
        (Json::String(s), ColumnType::Integer) => {
            Value::Integer(s.parse().map_err(|_| bad_cell(&s, column))?)
        }
        (Json::String(s), ColumnType::Real) => {
            Value::Real(s.parse().map_err(|_| bad_cell(&s, column))?)
        }
        (Json::String(s), ColumnType::Boolean) => {
            Value::Boolean(s.parse().map_err(|_| bad_cell(&s, column))?)
        }
        (Json::Number(n), ColumnType::Integer) => {
            Value::Integer(n.as_i64().ok_or_else(|| bad_cell(&n.to_string(), column))?)
        }
        (Json::Number(n), ColumnType::Real) => {
            Value::Real(n.as_f64().ok_or_else(|| bad_cell(&n.to_string(), column))?)
        }
        (Json::Number(n), ColumnType::Text) => Value::Text(n.to_string()),
        (Json::Bool(b), ColumnType::Boolean) => Value::Boolean(b),
        (other, _) => return Err(bad_cell(&other.to_string(), column)),
    };
    Ok(value)
}

fn bad_cell(cell: &str, column: &Column) -> RemoteError {
    RemoteError::InvalidResponse(format!(
        "cell {:?} does not fit column {:?} ({:?})",
        cell, column.name, column.ty
    ))
}
