use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Draft,
    Scheduled,
    Published,
    Archived,
    Deleted,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "scheduled" => Some(Self::Scheduled),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// The explicit legal-edge table of the status machine.
    ///
    /// Archived activities cannot republish; deleted is terminal here —
    /// restore is a dedicated operation back to draft, not a transition.
    pub fn can_transition_to(&self, next: ActivityStatus) -> bool {
        use ActivityStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Published)
                | (Draft, Deleted)
                | (Scheduled, Draft)
                | (Scheduled, Published)
                | (Scheduled, Deleted)
                | (Published, Archived)
                | (Published, Deleted)
                | (Archived, Deleted)
        )
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marketing microsite instance: metadata, lifecycle status, publication
/// window, four opaque config blobs, and an ordered component list (stored
/// separately, keyed by `activity_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub title: String,
    /// Globally unique; generated from the title when not supplied.
    pub slug: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub status: ActivityStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub publish_time: Option<DateTime<Utc>>,
    pub archive_time: Option<DateTime<Utc>>,
    pub layout_config: Value,
    pub seo_config: Value,
    pub share_config: Value,
    pub access_config: Value,
    pub template_id: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable activity row (id assigned by the store).
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub status: ActivityStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub layout_config: Value,
    pub seo_config: Value,
    pub share_config: Value,
    pub access_config: Value,
    pub template_id: Option<i64>,
}

impl NewActivity {
    pub fn draft(title: &str, slug: &str) -> Self {
        Self {
            title: title.to_string(),
            slug: slug.to_string(),
            description: None,
            cover_image: None,
            status: ActivityStatus::Draft,
            start_time: None,
            end_time: None,
            layout_config: Value::Object(Default::default()),
            seo_config: Value::Object(Default::default()),
            share_config: Value::Object(Default::default()),
            access_config: Value::Object(Default::default()),
            template_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateActivityParams {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub layout_config: Option<Value>,
    pub seo_config: Option<Value>,
    pub share_config: Option<Value>,
    pub access_config: Option<Value>,
    pub template_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateActivityParams {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub layout_config: Option<Value>,
    pub seo_config: Option<Value>,
    pub share_config: Option<Value>,
    pub access_config: Option<Value>,
}

/// Derive a URL slug from a title.
///
/// Lowercases ASCII, maps runs of non-alphanumeric characters to single
/// hyphens, trims leading/trailing hyphens. Titles with no usable
/// characters fall back to "activity".
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "activity".to_string()
    } else {
        slug
    }
}
