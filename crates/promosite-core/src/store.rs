//! Port traits decoupling the core services from storage, sessions, and
//! the lifecycle event bus.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::activity::{Activity, NewActivity};
use crate::component::{Component, NewComponent};
use crate::event::Event;
use crate::stats::DailyStats;
use crate::template::{NewTemplate, Template};

/// Scalar counter fields of a daily stats row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Pv,
    Uv,
    Share,
    FormSubmit,
    Conversion,
}

impl Counter {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Pv => "pv",
            Self::Uv => "uv",
            Self::Share => "share_count",
            Self::FormSubmit => "form_submit_count",
            Self::Conversion => "conversion_count",
        }
    }
}

/// The three frequency-map dimensions of a daily stats row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Device,
    Source,
    Region,
}

impl Dimension {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Device => "device_stats",
            Self::Source => "source_stats",
            Self::Region => "region_stats",
        }
    }
}

/// Append-only log of visitor interaction events.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()>;

    /// Whether a `visitor` event exists for this (activity, visitor) pair
    /// at ANY time. Deliberately unscoped by date: `uv` counts a visitor's
    /// lifetime-first visit to the activity, not their first visit today.
    async fn has_visitor_event(&self, activity_id: i64, visitor_id: &str)
        -> anyhow::Result<bool>;

    /// All events recorded for the activity on the given UTC calendar day.
    async fn events_on_day(&self, activity_id: i64, day: NaiveDate)
        -> anyhow::Result<Vec<Event>>;

    /// Age-based retention cleanup. Returns the number of rows removed.
    async fn delete_events_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}

/// Per-activity, per-day aggregate rows.
#[async_trait]
pub trait StatsStore: Send + Sync + 'static {
    /// Fetch the row for (activity, day), creating an all-zero row lazily
    /// on the first event of the day.
    async fn get_or_create(&self, activity_id: i64, date: NaiveDate)
        -> anyhow::Result<DailyStats>;

    /// Atomic scalar increment (`SET col = col + by` at the storage layer).
    async fn bump_counter(
        &self,
        activity_id: i64,
        date: NaiveDate,
        counter: Counter,
        by: i64,
    ) -> anyhow::Result<()>;

    /// Add to the day's cumulative stay duration (seconds).
    async fn add_stay_duration(
        &self,
        activity_id: i64,
        date: NaiveDate,
        seconds: f64,
    ) -> anyhow::Result<()>;

    /// Increment one key of a frequency map by 1, sanitizing malformed
    /// stored maps on the way through.
    async fn bump_dimension(
        &self,
        activity_id: i64,
        date: NaiveDate,
        dimension: Dimension,
        key: &str,
    ) -> anyhow::Result<()>;

    /// Overwrite the day's bounce rate (recomputed, never accumulated).
    async fn set_bounce_rate(
        &self,
        activity_id: i64,
        date: NaiveDate,
        rate: f64,
    ) -> anyhow::Result<()>;

    /// Rows for the activity within `[start, end]` (either bound optional),
    /// ordered by date ascending. Days with no row are simply absent.
    async fn range(
        &self,
        activity_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> anyhow::Result<Vec<DailyStats>>;
}

/// Storage for the content side: activities, components, templates.
///
/// `flush` is the explicit durability point the lifecycle event bus
/// double-dispatch brackets. Embedded backends may implement it as a
/// no-op; the contract is only that saves issued before `flush` are
/// durable once it returns.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    // --- activities ---
    async fn insert_activity(&self, activity: NewActivity) -> anyhow::Result<Activity>;
    async fn get_activity(&self, id: i64) -> anyhow::Result<Option<Activity>>;
    async fn save_activity(&self, activity: &Activity) -> anyhow::Result<()>;
    /// Hard delete: removes the activity row and its components.
    async fn remove_activity(&self, id: i64) -> anyhow::Result<bool>;
    async fn slug_exists(&self, slug: &str) -> anyhow::Result<bool>;
    /// Scheduled activities whose publication window has opened.
    async fn activities_due_for_publish(&self, now: DateTime<Utc>)
        -> anyhow::Result<Vec<Activity>>;
    /// Published activities whose `end_time` has passed.
    async fn activities_due_for_archive(&self, now: DateTime<Utc>)
        -> anyhow::Result<Vec<Activity>>;

    // --- components ---
    /// Ordered by (position, id) ascending.
    async fn components_for_activity(&self, activity_id: i64)
        -> anyhow::Result<Vec<Component>>;
    async fn get_component(&self, id: i64) -> anyhow::Result<Option<Component>>;
    async fn insert_component(
        &self,
        activity_id: i64,
        component: NewComponent,
    ) -> anyhow::Result<Component>;
    async fn save_component(&self, component: &Component) -> anyhow::Result<()>;
    async fn delete_components_for_activity(&self, activity_id: i64) -> anyhow::Result<u64>;

    // --- templates ---
    async fn insert_template(&self, template: NewTemplate) -> anyhow::Result<Template>;
    async fn get_template(&self, id: i64) -> anyhow::Result<Option<Template>>;
    async fn list_templates(&self, only_active: bool) -> anyhow::Result<Vec<Template>>;
    async fn template_code_exists(&self, code: &str) -> anyhow::Result<bool>;
    /// Persisted immediately, independent of any surrounding operation.
    async fn increment_template_usage(&self, id: i64) -> anyhow::Result<()>;
    async fn delete_template(&self, id: i64) -> anyhow::Result<bool>;

    /// Explicit flush-to-durable-storage, decoupled from individual saves.
    async fn flush(&self) -> anyhow::Result<()>;
}

/// Per-visitor session storage (string key/value, survives across requests
/// until session expiry). Holds the `visitor_id` idempotence key.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn get(&self, session_id: &str, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, session_id: &str, key: &str, value: &str) -> anyhow::Result<()>;
}

/// Lifecycle notification names dispatched by the services.
pub mod lifecycle_event {
    pub const CREATE: &str = "activity.create";
    pub const UPDATE: &str = "activity.update";
    pub const PUBLISH: &str = "activity.publish";
    pub const ARCHIVE: &str = "activity.archive";
    pub const DELETE: &str = "activity.delete";
    pub const RESTORE: &str = "activity.restore";
    pub const DUPLICATE: &str = "activity.duplicate";
}

/// Fire-and-forget notification bus for lifecycle consumers (logging,
/// cache invalidation, search indexing).
///
/// Every mutating lifecycle operation dispatches the SAME event twice —
/// once before and once after the store flush. Existing listeners depend
/// on both dispatch points; do not collapse them.
pub trait LifecycleEventBus: Send + Sync + 'static {
    fn dispatch(&self, event: &str, activity: &Activity, context: &Value);
}
