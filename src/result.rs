//! Tabular query results
//!
//! A `TabularResult` is an ordered sequence of typed rows under a fixed
//! column schema established at fetch time. The cache stores and replays
//! these without touching column order or types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column value types understood by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
}

/// A single column of the result schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl Value {
    /// Render for table output. Nulls render empty, like most SQL shells.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

/// A row that does not match the schema arity
#[derive(Debug, Error)]
#[error("Row has {got} values, schema has {expected} columns")]
pub struct RowShapeError {
    pub expected: usize,
    pub got: usize,
}

/// Ordered rows under a fixed schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    schema: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new(schema: Vec<Column>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Append a row, enforcing schema arity
    pub fn push_row(&mut self, row: Vec<Value>) -> std::result::Result<(), RowShapeError> {
        if row.len() != self.schema.len() {
            return Err(RowShapeError {
                expected: self.schema.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &[Column] {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as name -> value objects, for JSON output
    pub fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.schema
                    .iter()
                    .zip(row)
                    .map(|(col, value)| {
                        let json = match value {
                            Value::Null => serde_json::Value::Null,
                            Value::Text(s) => serde_json::Value::String(s.clone()),
                            Value::Integer(n) => serde_json::Value::from(*n),
                            Value::Real(f) => serde_json::Value::from(*f),
                            Value::Boolean(b) => serde_json::Value::Bool(*b),
                        };
                        (col.name.clone(), json)
                    })
                    .collect()
            })
            .collect()
    }
}
