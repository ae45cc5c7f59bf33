//! `EventStore` implementation: the raw interaction log.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use promosite_core::event::Event;
use promosite_core::store::EventStore;

use crate::backend::{fmt_ts, parse_json, parse_ts};
use crate::DuckDbBackend;

const EVENT_COLUMNS: &str = "id, activity_id, session_id, visitor_id, user_id, \
     event_type, event_data, client_ip, user_agent, referer, \
     CAST(created_at AS VARCHAR)";

struct EventRow {
    id: String,
    activity_id: i64,
    session_id: String,
    visitor_id: Option<String>,
    user_id: Option<i64>,
    event_type: String,
    event_data: String,
    client_ip: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    created_at: String,
}

impl EventRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            activity_id: row.get(1)?,
            session_id: row.get(2)?,
            visitor_id: row.get(3)?,
            user_id: row.get(4)?,
            event_type: row.get(5)?,
            event_data: row.get(6)?,
            client_ip: row.get(7)?,
            user_agent: row.get(8)?,
            referer: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_event(self) -> Result<Event> {
        Ok(Event {
            id: self.id,
            activity_id: self.activity_id,
            session_id: self.session_id,
            visitor_id: self.visitor_id,
            user_id: self.user_id,
            event_type: self.event_type,
            event_data: parse_json(&self.event_data),
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            referer: self.referer,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

#[async_trait]
impl EventStore for DuckDbBackend {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO events (id, activity_id, session_id, visitor_id, user_id, \
             event_type, event_data, client_ip, user_agent, referer, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            duckdb::params![
                event.id,
                event.activity_id,
                event.session_id,
                event.visitor_id,
                event.user_id,
                event.event_type,
                event.event_data.to_string(),
                event.client_ip,
                event.user_agent,
                event.referer,
                fmt_ts(event.created_at),
            ],
        )?;
        Ok(())
    }

    async fn has_visitor_event(&self, activity_id: i64, visitor_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare(
                "SELECT COUNT(*) FROM events \
                 WHERE activity_id = ?1 AND event_type = 'visitor' AND visitor_id = ?2",
            )?
            .query_row(duckdb::params![activity_id, visitor_id], |row| row.get(0))?;
        Ok(count > 0)
    }

    async fn events_on_day(&self, activity_id: i64, day: NaiveDate) -> Result<Vec<Event>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE activity_id = ?1 AND CAST(created_at AS DATE) = ?2 \
             ORDER BY created_at"
        ))?;
        let rows = stmt.query_map(
            duckdb::params![activity_id, day.to_string()],
            EventRow::from_row,
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    async fn delete_events_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM events WHERE created_at < ?1",
            duckdb::params![fmt_ts(cutoff)],
        )?;
        Ok(removed as u64)
    }
}
