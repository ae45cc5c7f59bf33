//! Daily aggregate rows and the pure accumulation primitives.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One aggregate row per (activity, calendar day).
///
/// Scalar counters are monotonically non-decreasing within a day.
/// `bounce_rate` is recomputed from raw events, never accumulated.
/// The three `*_stats` fields are string→integer frequency maps stored as
/// opaque JSON objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub activity_id: i64,
    pub date: NaiveDate,
    pub pv: i64,
    pub uv: i64,
    pub share_count: i64,
    pub form_submit_count: i64,
    pub conversion_count: i64,
    /// Cumulative seconds across all recorded visits, not an average.
    pub stay_duration: f64,
    /// Percentage 0–100.
    pub bounce_rate: f64,
    pub device_stats: Value,
    pub source_stats: Value,
    pub region_stats: Value,
}

impl DailyStats {
    pub fn empty(activity_id: i64, date: NaiveDate) -> Self {
        Self {
            activity_id,
            date,
            pv: 0,
            uv: 0,
            share_count: 0,
            form_submit_count: 0,
            conversion_count: 0,
            stay_duration: 0.0,
            bounce_rate: 0.0,
            device_stats: Value::Object(Map::new()),
            source_stats: Value::Object(Map::new()),
            region_stats: Value::Object(Map::new()),
        }
    }

    /// Combine two rows for manual consolidation.
    ///
    /// Scalar counters and stay duration are field-wise summed. Bounce rate
    /// is NOT summed or averaged here — a meaningful combined rate must be
    /// recomputed from sessions, so the merged row keeps 0. Frequency maps
    /// are left as the receiver's (merge is scalar-only).
    pub fn merge(&self, other: &DailyStats) -> DailyStats {
        DailyStats {
            activity_id: self.activity_id,
            date: self.date,
            pv: self.pv + other.pv,
            uv: self.uv + other.uv,
            share_count: self.share_count + other.share_count,
            form_submit_count: self.form_submit_count + other.form_submit_count,
            conversion_count: self.conversion_count + other.conversion_count,
            stay_duration: self.stay_duration + other.stay_duration,
            bounce_rate: 0.0,
            device_stats: self.device_stats.clone(),
            source_stats: self.source_stats.clone(),
            region_stats: self.region_stats.clone(),
        }
    }
}

/// Coerce an arbitrary JSON value into a clean frequency map.
///
/// Non-object input yields an empty map; entries whose value is not an
/// integer are dropped. Favors availability over strictness — malformed
/// stored blobs degrade to zero counts instead of erroring.
pub fn sanitize_counter_map(value: &Value) -> Map<String, Value> {
    let mut clean = Map::new();
    if let Value::Object(entries) = value {
        for (key, count) in entries {
            if let Some(n) = count.as_i64() {
                clean.insert(key.clone(), Value::from(n));
            }
        }
    }
    clean
}

/// Return a new frequency map with `key` incremented by 1.
///
/// Pure: the caller persists the returned value. Absent keys start at 0;
/// the input is sanitized first so a malformed map never propagates.
pub fn increment_stats_counter(current: &Value, key: &str) -> Value {
    let mut map = sanitize_counter_map(current);
    let next = map.get(key).and_then(Value::as_i64).unwrap_or(0) + 1;
    map.insert(key.to_string(), Value::from(next));
    Value::Object(map)
}

/// Sum frequency map `addend` into accumulator `into`.
pub fn accumulate_counter_map(into: &mut Map<String, Value>, addend: &Value) {
    for (key, count) in sanitize_counter_map(addend) {
        let n = count.as_i64().unwrap_or(0);
        let total = into.get(&key).and_then(Value::as_i64).unwrap_or(0) + n;
        into.insert(key, Value::from(total));
    }
}

/// Round to 2 decimal places, the precision of every derived rate.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Range totals plus derived metrics for an activity.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub pv: i64,
    pub uv: i64,
    pub share_count: i64,
    pub form_submit_count: i64,
    pub conversion_count: i64,
    pub stay_duration: f64,
    /// `conversion_count / uv * 100`, 0 when uv = 0.
    pub conversion_rate: f64,
    /// `stay_duration / pv`, 0 when pv = 0.
    pub avg_stay_duration: f64,
    /// Arithmetic mean of the per-day stored bounce rates (an approximation
    /// when days have unequal traffic; kept deliberately).
    pub bounce_rate: f64,
}

impl ActivitySummary {
    /// Fold a set of daily rows into range totals and derived metrics.
    pub fn from_rows(rows: &[DailyStats]) -> Self {
        let mut summary = Self {
            pv: 0,
            uv: 0,
            share_count: 0,
            form_submit_count: 0,
            conversion_count: 0,
            stay_duration: 0.0,
            conversion_rate: 0.0,
            avg_stay_duration: 0.0,
            bounce_rate: 0.0,
        };
        let mut bounce_total = 0.0;
        for row in rows {
            summary.pv += row.pv;
            summary.uv += row.uv;
            summary.share_count += row.share_count;
            summary.form_submit_count += row.form_submit_count;
            summary.conversion_count += row.conversion_count;
            summary.stay_duration += row.stay_duration;
            bounce_total += row.bounce_rate;
        }
        if summary.uv > 0 {
            summary.conversion_rate =
                round2(summary.conversion_count as f64 / summary.uv as f64 * 100.0);
        }
        if summary.pv > 0 {
            summary.avg_stay_duration = round2(summary.stay_duration / summary.pv as f64);
        }
        if !rows.is_empty() {
            summary.bounce_rate = round2(bounce_total / rows.len() as f64);
        }
        summary
    }
}

/// One day of the trend series.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub pv: i64,
    pub uv: i64,
    pub conversion_rate: f64,
}

impl TrendPoint {
    pub fn from_row(row: &DailyStats) -> Self {
        let conversion_rate = if row.uv > 0 {
            round2(row.conversion_count as f64 / row.uv as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            date: row.date,
            pv: row.pv,
            uv: row.uv,
            conversion_rate,
        }
    }
}
