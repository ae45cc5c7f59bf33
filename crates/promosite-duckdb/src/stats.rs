//! `StatsStore` implementation: the per-day aggregate rows.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use promosite_core::stats::{increment_stats_counter, DailyStats};
use promosite_core::store::{Counter, Dimension, StatsStore};

use crate::backend::{parse_date, parse_json};
use crate::DuckDbBackend;

const STATS_COLUMNS: &str = "activity_id, CAST(date AS VARCHAR), pv, uv, share_count, \
     form_submit_count, conversion_count, stay_duration, bounce_rate, \
     device_stats, source_stats, region_stats";

fn row_to_stats(row: &duckdb::Row<'_>) -> duckdb::Result<(DailyStats, String)> {
    let date_raw: String = row.get(1)?;
    let device: String = row.get(9)?;
    let source: String = row.get(10)?;
    let region: String = row.get(11)?;
    let stats = DailyStats {
        activity_id: row.get(0)?,
        // Placeholder until the date string is parsed outside the closure.
        date: NaiveDate::MIN,
        pv: row.get(2)?,
        uv: row.get(3)?,
        share_count: row.get(4)?,
        form_submit_count: row.get(5)?,
        conversion_count: row.get(6)?,
        stay_duration: row.get(7)?,
        bounce_rate: row.get(8)?,
        device_stats: parse_json(&device),
        source_stats: parse_json(&source),
        region_stats: parse_json(&region),
    };
    Ok((stats, date_raw))
}

#[async_trait]
impl StatsStore for DuckDbBackend {
    async fn get_or_create(&self, activity_id: i64, date: NaiveDate) -> Result<DailyStats> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO daily_stats (activity_id, date) VALUES (?1, ?2)",
            duckdb::params![activity_id, date.to_string()],
        )?;
        let (mut stats, date_raw) = conn
            .prepare(&format!(
                "SELECT {STATS_COLUMNS} FROM daily_stats WHERE activity_id = ?1 AND date = ?2"
            ))?
            .query_row(duckdb::params![activity_id, date.to_string()], row_to_stats)?;
        stats.date = parse_date(&date_raw)?;
        Ok(stats)
    }

    async fn bump_counter(
        &self,
        activity_id: i64,
        date: NaiveDate,
        counter: Counter,
        by: i64,
    ) -> Result<()> {
        // Atomic in-database increment; no read-modify-write race.
        let sql = match counter {
            Counter::Pv => {
                "UPDATE daily_stats SET pv = pv + ?1 WHERE activity_id = ?2 AND date = ?3"
            }
            Counter::Uv => {
                "UPDATE daily_stats SET uv = uv + ?1 WHERE activity_id = ?2 AND date = ?3"
            }
            Counter::Share => {
                "UPDATE daily_stats SET share_count = share_count + ?1 \
                 WHERE activity_id = ?2 AND date = ?3"
            }
            Counter::FormSubmit => {
                "UPDATE daily_stats SET form_submit_count = form_submit_count + ?1 \
                 WHERE activity_id = ?2 AND date = ?3"
            }
            Counter::Conversion => {
                "UPDATE daily_stats SET conversion_count = conversion_count + ?1 \
                 WHERE activity_id = ?2 AND date = ?3"
            }
        };
        let conn = self.conn.lock().await;
        conn.execute(sql, duckdb::params![by, activity_id, date.to_string()])?;
        Ok(())
    }

    async fn add_stay_duration(
        &self,
        activity_id: i64,
        date: NaiveDate,
        seconds: f64,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE daily_stats SET stay_duration = stay_duration + ?1 \
             WHERE activity_id = ?2 AND date = ?3",
            duckdb::params![seconds, activity_id, date.to_string()],
        )?;
        Ok(())
    }

    async fn bump_dimension(
        &self,
        activity_id: i64,
        date: NaiveDate,
        dimension: Dimension,
        key: &str,
    ) -> Result<()> {
        let (select_sql, update_sql) = match dimension {
            Dimension::Device => (
                "SELECT device_stats FROM daily_stats WHERE activity_id = ?1 AND date = ?2",
                "UPDATE daily_stats SET device_stats = ?1 WHERE activity_id = ?2 AND date = ?3",
            ),
            Dimension::Source => (
                "SELECT source_stats FROM daily_stats WHERE activity_id = ?1 AND date = ?2",
                "UPDATE daily_stats SET source_stats = ?1 WHERE activity_id = ?2 AND date = ?3",
            ),
            Dimension::Region => (
                "SELECT region_stats FROM daily_stats WHERE activity_id = ?1 AND date = ?2",
                "UPDATE daily_stats SET region_stats = ?1 WHERE activity_id = ?2 AND date = ?3",
            ),
        };

        // Read-sanitize-increment-write, holding the connection lock for the
        // whole cycle so maps never lose increments.
        let conn = self.conn.lock().await;
        let current: String = conn
            .prepare(select_sql)?
            .query_row(duckdb::params![activity_id, date.to_string()], |row| {
                row.get(0)
            })?;
        let next = increment_stats_counter(&parse_json(&current), key);
        conn.execute(
            update_sql,
            duckdb::params![next.to_string(), activity_id, date.to_string()],
        )?;
        Ok(())
    }

    async fn set_bounce_rate(&self, activity_id: i64, date: NaiveDate, rate: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE daily_stats SET bounce_rate = ?1 WHERE activity_id = ?2 AND date = ?3",
            duckdb::params![rate, activity_id, date.to_string()],
        )?;
        Ok(())
    }

    async fn range(
        &self,
        activity_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailyStats>> {
        let conn = self.conn.lock().await;
        // Open bounds collapse to the full DATE domain so one statement
        // covers all four start/end combinations.
        let start = start.map_or_else(|| "0001-01-01".to_string(), |d| d.to_string());
        let end = end.map_or_else(|| "9999-12-31".to_string(), |d| d.to_string());
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATS_COLUMNS} FROM daily_stats \
             WHERE activity_id = ?1 AND date >= ?2 AND date <= ?3 \
             ORDER BY date"
        ))?;
        let rows = stmt.query_map(duckdb::params![activity_id, start, end], row_to_stats)?;

        let mut out = Vec::new();
        for row in rows {
            let (mut stats, date_raw) = row?;
            stats.date = parse_date(&date_raw)?;
            out.push(stats);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, n).unwrap()
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        let first = db.get_or_create(1, day(1)).await.unwrap();
        assert_eq!(first.pv, 0);
        db.bump_counter(1, day(1), Counter::Pv, 2).await.unwrap();
        let again = db.get_or_create(1, day(1)).await.unwrap();
        // The existing row is returned, not reset.
        assert_eq!(again.pv, 2);
    }

    #[tokio::test]
    async fn counters_accumulate_per_day() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        db.get_or_create(1, day(1)).await.unwrap();
        db.get_or_create(1, day(2)).await.unwrap();
        db.bump_counter(1, day(1), Counter::Pv, 1).await.unwrap();
        db.bump_counter(1, day(1), Counter::Pv, 1).await.unwrap();
        db.bump_counter(1, day(2), Counter::Conversion, 1).await.unwrap();

        let rows = db.range(1, None, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[0].pv, 2);
        assert_eq!(rows[1].conversion_count, 1);
    }

    #[tokio::test]
    async fn dimension_maps_grow_key_by_key() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        db.get_or_create(1, day(1)).await.unwrap();
        db.bump_dimension(1, day(1), Dimension::Device, "mobile").await.unwrap();
        db.bump_dimension(1, day(1), Dimension::Device, "mobile").await.unwrap();
        db.bump_dimension(1, day(1), Dimension::Device, "desktop").await.unwrap();
        db.bump_dimension(1, day(1), Dimension::Source, "wechat").await.unwrap();

        let row = db.get_or_create(1, day(1)).await.unwrap();
        assert_eq!(row.device_stats, json!({"mobile": 2, "desktop": 1}));
        assert_eq!(row.source_stats, json!({"wechat": 1}));
        assert_eq!(row.region_stats, json!({}));
    }

    #[tokio::test]
    async fn bounce_rate_is_overwritten_not_accumulated() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        db.get_or_create(1, day(1)).await.unwrap();
        db.set_bounce_rate(1, day(1), 40.0).await.unwrap();
        db.set_bounce_rate(1, day(1), 25.0).await.unwrap();
        let row = db.get_or_create(1, day(1)).await.unwrap();
        assert_eq!(row.bounce_rate, 25.0);
    }

    #[tokio::test]
    async fn range_respects_bounds_and_activity_scope() {
        let db = DuckDbBackend::open_in_memory().unwrap();
        for d in 1..=4 {
            db.get_or_create(1, day(d)).await.unwrap();
        }
        db.get_or_create(2, day(2)).await.unwrap();

        let rows = db.range(1, Some(day(2)), Some(day(3))).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(2));
        assert_eq!(rows[1].date, day(3));

        let open_start = db.range(1, None, Some(day(2))).await.unwrap();
        assert_eq!(open_start.len(), 2);
    }
}
