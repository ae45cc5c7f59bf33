use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reusable named layout blueprint for seeding new activities.
///
/// `layout_config` holds a `components` array whose entries
/// (`{type, props}`) are materialized into real components at
/// instantiation time. System templates are protected from deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    /// Globally unique template code.
    pub code: String,
    pub category: String,
    pub description: Option<String>,
    pub layout_config: Value,
    /// Seed values (title/description/cover_image) captured at snapshot.
    pub default_data: Value,
    pub is_system: bool,
    pub is_active: bool,
    /// Incremented every time the template instantiates an activity.
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable template row (id assigned by the store).
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub code: String,
    pub category: String,
    pub description: Option<String>,
    pub layout_config: Value,
    pub default_data: Value,
    pub is_system: bool,
    pub is_active: bool,
}
