//! `SessionStore` implementation: per-visitor key/value storage.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use promosite_core::store::SessionStore;

use crate::backend::fmt_ts;
use crate::DuckDbBackend;

#[async_trait]
impl SessionStore for DuckDbBackend {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let value = conn
            .prepare("SELECT value FROM sessions WHERE session_id = ?1 AND key = ?2")?
            .query_row(duckdb::params![session_id, key], |row| row.get(0))
            .map(Some)
            .or_else(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(value)
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sessions (session_id, key, value, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (session_id, key) DO UPDATE \
             SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
            duckdb::params![session_id, key, value, fmt_ts(Utc::now())],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_keys_read_as_none() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        assert_eq!(db.get("s1", "visitor_id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_and_overwrite() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        db.set("s1", "visitor_id", "visitor_a").await.unwrap();
        assert_eq!(
            db.get("s1", "visitor_id").await.unwrap().as_deref(),
            Some("visitor_a")
        );

        db.set("s1", "visitor_id", "visitor_b").await.unwrap();
        assert_eq!(
            db.get("s1", "visitor_id").await.unwrap().as_deref(),
            Some("visitor_b")
        );

        // Keys are scoped per session.
        assert_eq!(db.get("s2", "visitor_id").await.unwrap(), None);
    }
}
