use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known event type strings.
///
/// The `event_type` field is an open string — new types can be recorded
/// without touching this module — but the aggregation pipeline keys off
/// these constants.
pub mod event_type {
    pub const VIEW: &str = "view";
    pub const CLICK: &str = "click";
    pub const SHARE: &str = "share";
    pub const FORM_SUBMIT: &str = "form_submit";
    pub const CONVERSION: &str = "conversion";
    pub const COMPONENT_INTERACT: &str = "component_interact";
    pub const VISITOR: &str = "visitor";
    pub const STAY_DURATION: &str = "stay_duration";
}

/// One immutable visitor-interaction record.
///
/// Events reference their activity by id only (no object graph) so
/// high-volume inserts stay cheap. They are never mutated; the only delete
/// path is the age-based retention cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// UUID v4.
    pub id: String,
    pub activity_id: i64,
    /// Session correlation key supplied by the tracking client.
    pub session_id: String,
    /// Set on `view` and `visitor` events; used for unique-visitor dedup.
    pub visitor_id: Option<String>,
    pub user_id: Option<i64>,
    pub event_type: String,
    /// Opaque JSON object; shape depends on `event_type`.
    pub event_data: Value,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(activity_id: i64, session_id: &str, event_type: &str, event_data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            activity_id,
            session_id: session_id.to_string(),
            visitor_id: None,
            user_id: None,
            event_type: event_type.to_string(),
            event_data,
            client_ip: None,
            user_agent: None,
            referer: None,
            created_at: Utc::now(),
        }
    }
}

/// Request-derived inputs consumed by the collector.
///
/// The HTTP layer fills this from the User-Agent / Referer headers, the
/// `utm_source` query parameter, and the client address; the collector
/// never touches the request itself.
#[derive(Debug, Clone, Default)]
pub struct TrackContext {
    pub session_id: String,
    pub user_id: Option<i64>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub utm_source: Option<String>,
    pub client_ip: Option<String>,
}
