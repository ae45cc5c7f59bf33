use thiserror::Error;

use crate::activity::ActivityStatus;

/// Domain errors raised by the lifecycle and templating services.
///
/// Storage failures travel through the transparent `Store` variant so
/// callers can still downcast to the typed variants for state errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot transition activity {id} from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: ActivityStatus,
        to: ActivityStatus,
    },

    #[error("activity {0} is not deleted")]
    NotDeleted(i64),

    #[error("component {component_id} does not belong to activity {activity_id}")]
    ForeignComponent {
        component_id: i64,
        activity_id: i64,
    },

    #[error("reorder list must cover every component of activity {0} exactly once")]
    IncompleteOrder(i64),

    #[error("template code '{0}' already exists")]
    DuplicateTemplateCode(String),

    #[error("template {0} is a system template and cannot be deleted")]
    SystemTemplate(i64),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
