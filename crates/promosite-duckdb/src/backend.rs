use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use crate::schema::init_sql;

/// DuckDB backend holding the single embedded connection.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent
/// writes contend. The connection lives behind `Arc<Mutex<_>>` so the
/// async runtime serialises access while the struct stays cheap to clone
/// into Axum handlers and the scheduler.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
    /// read from `Config.duckdb_memory_limit` at the call site. Schema init
    /// is idempotent, so re-opening an existing file is safe.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory DuckDB database.
    ///
    /// Intended for tests only — data is discarded when the struct drops.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Errors when the connection is
    /// unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the connection lock for direct queries.
    ///
    /// Intended for integration tests that verify stored data; production
    /// code goes through the port trait implementations.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    pub(crate) fn next_id(conn: &Connection, sequence: &str) -> Result<i64> {
        let sql = match sequence {
            "seq_activity_id" => "SELECT nextval('seq_activity_id')",
            "seq_component_id" => "SELECT nextval('seq_component_id')",
            "seq_template_id" => "SELECT nextval('seq_template_id')",
            other => anyhow::bail!("unknown sequence {other}"),
        };
        let id: i64 = conn.prepare(sql)?.query_row([], |row| row.get(0))?;
        Ok(id)
    }
}

/// Format a timestamp the way DuckDB expects TIMESTAMP literals.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

pub(crate) fn fmt_ts_opt(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(fmt_ts)
}

/// Parse a `CAST(ts AS VARCHAR)` column back into a UTC timestamp.
pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")?;
    Ok(naive.and_utc())
}

pub(crate) fn parse_ts_opt(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
}

/// Parse a stored JSON blob, degrading malformed text to an empty object.
pub(crate) fn parse_json(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_succeeds_on_fresh_database() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        db.ping().await.unwrap();
    }

    #[test]
    fn timestamps_round_trip_through_the_wire_format() {
        let now = Utc::now();
        let parsed = parse_ts(&fmt_ts(now)).unwrap();
        // Microsecond precision survives the round trip.
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn malformed_json_degrades_to_empty_object() {
        assert_eq!(parse_json("{not json"), serde_json::json!({}));
        assert_eq!(parse_json(r#"{"a":1}"#), serde_json::json!({"a":1}));
    }
}
