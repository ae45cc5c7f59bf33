//! Event ingestion and derived-metric computation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use crate::classify::{classify_device, classify_region, classify_source};
use crate::event::{event_type, Event, TrackContext};
use crate::stats::{accumulate_counter_map, round2, ActivitySummary, TrendPoint};
use crate::store::{Counter, Dimension, EventStore, SessionStore, StatsStore};

/// Session key under which the visitor id is persisted.
const VISITOR_ID_KEY: &str = "visitor_id";

/// Outcome of a recorded page view.
#[derive(Debug, Clone)]
pub struct PageView {
    pub visitor_id: String,
    /// True when this was the visitor's lifetime-first visit to the
    /// activity (i.e. `uv` was incremented).
    pub new_visitor: bool,
    pub device: String,
    pub source: String,
    pub region: String,
}

/// The ingestion and derivation engine.
///
/// Writes go through the injected stores; the collector itself holds no
/// state. Derived metrics are computed from the stored daily aggregates,
/// never by re-scanning raw events — except [`Self::calculate_bounce_rate`],
/// which is the one explicit re-derivation from the event log.
pub struct StatsCollector {
    events: Arc<dyn EventStore>,
    stats: Arc<dyn StatsStore>,
    sessions: Arc<dyn SessionStore>,
}

fn rand_hex(n: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

impl StatsCollector {
    pub fn new(
        events: Arc<dyn EventStore>,
        stats: Arc<dyn StatsStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            events,
            stats,
            sessions,
        }
    }

    /// Record one page view.
    ///
    /// `pv` is incremented unconditionally. `uv` is incremented only on
    /// the visitor's lifetime-first visit to this activity, detected by
    /// the absence of a prior `visitor` event for the pair; the dedup
    /// marker event is written in the same call. Device, source, and
    /// region are classified from the request context and bumped into the
    /// day's frequency maps.
    pub async fn record_page_view(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
    ) -> anyhow::Result<PageView> {
        let visitor_id = self.resolve_visitor_id(&ctx.session_id).await?;
        let today = Utc::now().date_naive();

        self.stats.get_or_create(activity_id, today).await?;
        self.stats
            .bump_counter(activity_id, today, Counter::Pv, 1)
            .await?;

        let new_visitor = !self
            .events
            .has_visitor_event(activity_id, &visitor_id)
            .await?;
        if new_visitor {
            self.stats
                .bump_counter(activity_id, today, Counter::Uv, 1)
                .await?;
            let mut marker = Event::new(
                activity_id,
                &ctx.session_id,
                event_type::VISITOR,
                json!({ "visitor_id": visitor_id }),
            );
            marker.visitor_id = Some(visitor_id.clone());
            marker.user_id = ctx.user_id;
            self.events.insert_event(&marker).await?;
        }

        let device = classify_device(ctx.user_agent.as_deref().unwrap_or(""));
        let source = classify_source(ctx.utm_source.as_deref(), ctx.referer.as_deref());
        let region = classify_region(ctx.client_ip.as_deref());

        self.stats
            .bump_dimension(activity_id, today, Dimension::Device, device)
            .await?;
        self.stats
            .bump_dimension(activity_id, today, Dimension::Source, &source)
            .await?;
        self.stats
            .bump_dimension(activity_id, today, Dimension::Region, region)
            .await?;

        let mut view = self.event_from_ctx(
            activity_id,
            ctx,
            event_type::VIEW,
            json!({ "device": device, "source": source, "region": region }),
        );
        view.visitor_id = Some(visitor_id.clone());
        self.events.insert_event(&view).await?;

        Ok(PageView {
            visitor_id,
            new_visitor,
            device: device.to_string(),
            source,
            region: region.to_string(),
        })
    }

    pub async fn record_share(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        data: Value,
    ) -> anyhow::Result<()> {
        self.record_counter_event(activity_id, ctx, Counter::Share, event_type::SHARE, data)
            .await
    }

    pub async fn record_form_submit(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        data: Value,
    ) -> anyhow::Result<()> {
        self.record_counter_event(
            activity_id,
            ctx,
            Counter::FormSubmit,
            event_type::FORM_SUBMIT,
            data,
        )
        .await
    }

    pub async fn record_conversion(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        data: Value,
    ) -> anyhow::Result<()> {
        self.record_counter_event(
            activity_id,
            ctx,
            Counter::Conversion,
            event_type::CONVERSION,
            data,
        )
        .await
    }

    /// Add to the day's cumulative stay duration. Stored as a running sum;
    /// averaging happens only at summary time.
    pub async fn record_stay_duration(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        seconds: f64,
    ) -> anyhow::Result<()> {
        let today = Utc::now().date_naive();
        self.stats.get_or_create(activity_id, today).await?;
        self.stats
            .add_stay_duration(activity_id, today, seconds)
            .await?;
        let event = self.event_from_ctx(
            activity_id,
            ctx,
            event_type::STAY_DURATION,
            json!({ "seconds": seconds }),
        );
        self.events.insert_event(&event).await
    }

    /// Record an arbitrary event type (click, component_interact, ...)
    /// without touching any counter.
    pub async fn record_event(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        kind: &str,
        data: Value,
    ) -> anyhow::Result<()> {
        let event = self.event_from_ctx(activity_id, ctx, kind, data);
        self.events.insert_event(&event).await
    }

    /// Recompute today's bounce rate from the raw event log.
    ///
    /// Groups today's events by session; a session with exactly one event
    /// is a bounce. Zero sessions → no-op, `None`. Must be invoked
    /// explicitly — this is never run per-event.
    pub async fn calculate_bounce_rate(&self, activity_id: i64) -> anyhow::Result<Option<f64>> {
        let today = Utc::now().date_naive();
        let events = self.events.events_on_day(activity_id, today).await?;

        let mut per_session: HashMap<&str, u64> = HashMap::new();
        for event in &events {
            *per_session.entry(event.session_id.as_str()).or_insert(0) += 1;
        }
        if per_session.is_empty() {
            return Ok(None);
        }

        let bounces = per_session.values().filter(|&&count| count == 1).count();
        let rate = round2(bounces as f64 / per_session.len() as f64 * 100.0);
        self.stats
            .set_bounce_rate(activity_id, today, rate)
            .await?;
        Ok(Some(rate))
    }

    /// Range totals plus derived rates, from stored aggregates only.
    pub async fn activity_summary(
        &self,
        activity_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> anyhow::Result<ActivitySummary> {
        let rows = self.stats.range(activity_id, start, end).await?;
        Ok(ActivitySummary::from_rows(&rows))
    }

    /// One point per stored day in `[today-(days-1), today]`. Days without
    /// a row are absent, not zero-filled.
    pub async fn trend(&self, activity_id: i64, days: u32) -> anyhow::Result<Vec<TrendPoint>> {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(days.saturating_sub(1) as i64);
        let rows = self.stats.range(activity_id, Some(start), Some(today)).await?;
        Ok(rows.iter().map(TrendPoint::from_row).collect())
    }

    pub async fn device_distribution(&self, activity_id: i64) -> anyhow::Result<Value> {
        self.distribution(activity_id, Dimension::Device).await
    }

    pub async fn source_distribution(&self, activity_id: i64) -> anyhow::Result<Value> {
        self.distribution(activity_id, Dimension::Source).await
    }

    pub async fn region_distribution(&self, activity_id: i64) -> anyhow::Result<Value> {
        self.distribution(activity_id, Dimension::Region).await
    }

    /// Age-based retention cleanup; returns the number of events removed.
    pub async fn cleanup_events(&self, older_than_days: u32) -> anyhow::Result<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days as i64);
        self.events.delete_events_before(cutoff).await
    }

    /// Sum one frequency map across ALL of the activity's daily rows.
    async fn distribution(&self, activity_id: i64, dimension: Dimension) -> anyhow::Result<Value> {
        let rows = self.stats.range(activity_id, None, None).await?;
        let mut total = Map::new();
        for row in &rows {
            let map = match dimension {
                Dimension::Device => &row.device_stats,
                Dimension::Source => &row.source_stats,
                Dimension::Region => &row.region_stats,
            };
            accumulate_counter_map(&mut total, map);
        }
        Ok(Value::Object(total))
    }

    async fn record_counter_event(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        counter: Counter,
        kind: &str,
        data: Value,
    ) -> anyhow::Result<()> {
        let today = Utc::now().date_naive();
        self.stats.get_or_create(activity_id, today).await?;
        self.stats
            .bump_counter(activity_id, today, counter, 1)
            .await?;
        let event = self.event_from_ctx(activity_id, ctx, kind, data);
        self.events.insert_event(&event).await
    }

    /// Resolve the session's visitor id, minting and persisting one on
    /// first sight. The minted id is the idempotence key for `uv`.
    async fn resolve_visitor_id(&self, session_id: &str) -> anyhow::Result<String> {
        if let Some(existing) = self.sessions.get(session_id, VISITOR_ID_KEY).await? {
            return Ok(existing);
        }
        let minted = format!("visitor_{}", rand_hex(8));
        self.sessions
            .set(session_id, VISITOR_ID_KEY, &minted)
            .await?;
        Ok(minted)
    }

    fn event_from_ctx(
        &self,
        activity_id: i64,
        ctx: &TrackContext,
        kind: &str,
        data: Value,
    ) -> Event {
        let mut event = Event::new(activity_id, &ctx.session_id, kind, data);
        event.user_id = ctx.user_id;
        event.client_ip = ctx.client_ip.clone();
        event.user_agent = ctx.user_agent.clone();
        event.referer = ctx.referer.clone();
        event
    }
}
