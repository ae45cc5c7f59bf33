use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One configurable content block within an activity's layout.
///
/// `component_type` is a free string — validated only at render time by the
/// (external) component registry, never at write time. `position` defines
/// render order; it is not required to be unique or dense, and ties are
/// broken by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    pub activity_id: i64,
    pub component_type: String,
    pub config: Value,
    pub position: i32,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    /// Swap with the immediate predecessor. No-op at position 0 — the
    /// return value says whether anything changed.
    pub fn move_up(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        true
    }

    /// Unconditional increment; there is no upper bound against sibling
    /// count, so positions are relative order, not a dense index.
    pub fn move_down(&mut self) {
        self.position += 1;
    }

    /// Copy of this component's content, placed directly after the
    /// original. Detached (no id, no owner) until inserted.
    pub fn duplicate(&self) -> NewComponent {
        NewComponent {
            component_type: self.component_type.clone(),
            config: self.config.clone(),
            position: self.position + 1,
            is_visible: self.is_visible,
        }
    }
}

/// Insertable component row (id and owner assigned at insert).
#[derive(Debug, Clone)]
pub struct NewComponent {
    pub component_type: String,
    pub config: Value,
    pub position: i32,
    pub is_visible: bool,
}

/// Caller-supplied component description for the replace-all operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub config: Value,
    /// Explicit position; defaults to the descriptor's index in the input.
    pub position: Option<i32>,
    pub is_visible: Option<bool>,
}
