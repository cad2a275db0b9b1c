//! Embedded local store for cached result sets
//!
//! Backed by an in-memory SQLite database. Each entry has a row in the
//! `cache_entries` metadata table (key, statement, schema, timestamps) and
//! its own result table holding the rows as real typed columns, so cached
//! data stays queryable rather than becoming an opaque blob.
//!
//! Expired entries are evicted lazily: only a `lookup` that trips over one
//! removes it. There is no background scanning.

use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, params};
use std::time::Duration;

use crate::error::StoreError;
use crate::result::{Column, TabularResult, Value};

type Result<T> = std::result::Result<T, StoreError>;

/// In-process keyed storage of cached result sets with TTL-based liveness
pub struct LocalStore {
    conn: Connection,
    max_entries: Option<usize>,
}

impl LocalStore {
    /// Open a fresh in-memory store with no capacity ceiling
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with_capacity(None)
    }

    /// Open a fresh in-memory store evicting oldest entries past `max`
    pub fn with_capacity(max: usize) -> Result<Self> {
        Self::open_with_capacity(Some(max))
    }

    fn open_with_capacity(max_entries: Option<usize>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY NOT NULL,
                statement TEXT NOT NULL,
                schema_json TEXT NOT NULL,
                result_table TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                ttl_ms INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expires_at ON cache_entries(expires_at);
            CREATE INDEX IF NOT EXISTS idx_created_at ON cache_entries(created_at);
            "#,
        )?;

        Ok(Self { conn, max_entries })
    }

    /// Return the rows for `key` if a live entry exists.
    ///
    /// A lookup that finds an expired entry removes it before returning
    /// `None` (lazy eviction).
    pub fn lookup(&mut self, key: &str) -> Result<Option<TabularResult>> {
        let now = Utc::now().timestamp_millis();

        let entry: Option<(String, String, i64)> = self
            .conn
            .query_row(
                "SELECT schema_json, result_table, expires_at
                 FROM cache_entries WHERE cache_key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((schema_json, result_table, expires_at)) = entry else {
            return Ok(None);
        };

        if expires_at <= now {
            log::debug!("Evicting expired entry {}", &key[..8.min(key.len())]);
            self.delete_entry(key, &result_table)?;
            return Ok(None);
        }

        let schema: Vec<Column> = serde_json::from_str(&schema_json)
            .map_err(|e| StoreError::CorruptEntry(format!("bad schema json: {}", e)))?;
        self.read_result_table(&result_table, schema).map(Some)
    }

    /// Insert or replace the entry for `key` with `created_at = now`.
    ///
    /// Overwriting a still-live entry is expected when a caller refreshes.
    pub fn put(
        &mut self,
        key: &str,
        statement: &str,
        rows: &TabularResult,
        ttl: Duration,
    ) -> Result<()> {
        // Millisecond timestamps keep creation order distinguishable within
        // a burst of puts
        let now = Utc::now().timestamp_millis();
        let ttl_ms = ttl.as_millis().min(i64::MAX as u128) as i64;
        let result_table = result_table_name(key);
        let schema_json = serde_json::to_string(rows.schema())
            .map_err(|e| StoreError::CorruptEntry(format!("unencodable schema: {}", e)))?;
        let ddl = result_table_ddl(&result_table, rows.schema())?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", result_table))?;
        tx.execute_batch(&ddl)?;
        {
            let placeholders = vec!["?"; rows.schema().len()].join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" VALUES ({})",
                result_table, placeholders
            ))?;
            for row in rows.rows() {
                stmt.execute(rusqlite::params_from_iter(row.iter().map(to_sql_value)))?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO cache_entries
             (cache_key, statement, schema_json, result_table, row_count,
              created_at, ttl_ms, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                key,
                statement,
                schema_json,
                result_table,
                rows.row_count() as i64,
                now,
                ttl_ms,
                now + ttl_ms,
            ],
        )?;
        tx.commit()?;

        if let Some(max) = self.max_entries {
            self.enforce_capacity(max, key)?;
        }
        Ok(())
    }

    /// Explicit invalidation; returns whether a live entry existed.
    ///
    /// An expired-but-unvisited entry counts as absent, same as in
    /// `lookup`; its row and result table are still cleaned up.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let entry: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT result_table, expires_at FROM cache_entries WHERE cache_key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match entry {
            Some((table, expires_at)) => {
                self.delete_entry(key, &table)?;
                Ok(expires_at > now)
            }
            None => Ok(false),
        }
    }

    /// Number of entries currently stored, expired-but-unvisited included
    pub fn size(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&mut self) -> Result<usize> {
        let tables: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT result_table FROM cache_entries")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        let tx = self.conn.transaction()?;
        for table in &tables {
            validate_identifier(table)?;
            tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", table))?;
        }
        tx.execute("DELETE FROM cache_entries", [])?;
        tx.commit()?;
        Ok(tables.len())
    }

    /// Snapshot of store state for the operational surface
    pub fn stats(&self) -> Result<StoreStats> {
        let now = Utc::now().timestamp_millis();

        let (total_entries, total_rows): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(row_count), 0) FROM cache_entries",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let live_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE expires_at > ?1",
            [now],
            |r| r.get(0),
        )?;

        let (oldest, newest): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM cache_entries WHERE expires_at > ?1",
            [now],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        Ok(StoreStats {
            total_entries: total_entries as usize,
            live_entries: live_entries as usize,
            expired_entries: (total_entries - live_entries) as usize,
            total_rows: total_rows as usize,
            oldest_entry: oldest,
            newest_entry: newest,
        })
    }

    /// Delete oldest-created entries until the store fits under `max`.
    /// Oldest-first is the cheapest-to-reproduce order for this workload.
    /// The entry just written under `keep` is never the victim, so a put
    /// that trips the ceiling cannot turn its own key into a miss.
    fn enforce_capacity(&mut self, max: usize, keep: &str) -> Result<()> {
        loop {
            let over = self.size()?.saturating_sub(max);
            if over == 0 {
                return Ok(());
            }
            let victim: Option<(String, String)> = self
                .conn
                .query_row(
                    "SELECT cache_key, result_table FROM cache_entries
                     WHERE cache_key != ?1
                     ORDER BY created_at ASC, cache_key ASC LIMIT 1",
                    [keep],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((key, table)) = victim else {
                return Ok(());
            };
            log::debug!("Capacity eviction of entry {}", &key[..8.min(key.len())]);
            self.delete_entry(&key, &table)?;
        }
    }

    fn delete_entry(&mut self, key: &str, result_table: &str) -> Result<()> {
        validate_identifier(result_table)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", result_table))?;
        tx.execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
        tx.commit()?;
        Ok(())
    }

    fn read_result_table(&self, table: &str, schema: Vec<Column>) -> Result<TabularResult> {
        validate_identifier(table)?;
        let mut result = TabularResult::new(schema);

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM \"{}\" ORDER BY rowid", table))?;
        let column_count = stmt.column_count();
        if column_count != result.schema().len() {
            return Err(StoreError::CorruptEntry(format!(
                "result table has {} columns, schema has {}",
                column_count,
                result.schema().len()
            )));
        }

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for (i, column) in result.schema().iter().enumerate() {
                values.push(from_sql_value(row.get_ref(i)?, column)?);
            }
            result
                .push_row(values)
                .map_err(|e| StoreError::CorruptEntry(e.to_string()))?;
        }
        Ok(result)
    }
}

/// Statistics about store state
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_entries: usize,
    pub live_entries: usize,
    pub expired_entries: usize,
    pub total_rows: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

fn result_table_name(key: &str) -> String {
    format!("r_{}", key)
}

fn result_table_ddl(table: &str, schema: &[Column]) -> Result<String> {
    validate_identifier(table)?;
    let mut columns = Vec::with_capacity(schema.len());
    for col in schema {
        if col.name.is_empty() || col.name.contains('"') || col.name.chars().any(char::is_control)
        {
            return Err(StoreError::CorruptEntry(format!(
                "column name {:?} cannot be stored",
                col.name
            )));
        }
        let sql_type = match col.ty {
            crate::result::ColumnType::Text => "TEXT",
            crate::result::ColumnType::Integer => "INTEGER",
            crate::result::ColumnType::Real => "REAL",
            crate::result::ColumnType::Boolean => "INTEGER",
        };
        columns.push(format!("\"{}\" {}", col.name, sql_type));
    }
    Ok(format!("CREATE TABLE \"{}\" ({})", table, columns.join(", ")))
}

/// Table names are interpolated into DDL, so hold them to the generated shape
fn validate_identifier(table: &str) -> Result<()> {
    let valid = table.starts_with("r_")
        && !table[2..].is_empty()
        && table[2..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::CorruptEntry(format!(
            "unexpected result table name {:?}",
            table
        )));
    }
    Ok(())
}

fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Text(s) => Sql::Text(s.clone()),
        Value::Integer(n) => Sql::Integer(*n),
        Value::Real(f) => Sql::Real(*f),
        Value::Boolean(b) => Sql::Integer(*b as i64),
    }
}

/// Coerce a stored cell back through the declared column type, so the
/// replayed result carries the exact schema the warehouse produced.
fn from_sql_value(raw: ValueRef<'_>, column: &Column) -> Result<Value> {
    use crate::result::ColumnType;

    let value = match (raw, column.ty) {
        (ValueRef::Null, _) => Value::Null,
        (ValueRef::Text(bytes), ColumnType::Text) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| StoreError::CorruptEntry(format!("non-utf8 text cell: {}", e)))?;
            Value::Text(s.to_string())
        }
        (ValueRef::Integer(n), ColumnType::Integer) => Value::Integer(n),
        (ValueRef::Integer(n), ColumnType::Boolean) => Value::Boolean(n != 0),
        (ValueRef::Real(f), ColumnType::Real) => Value::Real(f),
        (ValueRef::Integer(n), ColumnType::Real) => Value::Real(n as f64),
        (other, ty) => {
            return Err(StoreError::CorruptEntry(format!(
                "cell of sqlite type {:?} under column {:?} declared {:?}",
                other.data_type(),
                column.name,
                ty
            )));
        }
    };
    Ok(value)
}
