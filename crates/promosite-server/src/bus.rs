use promosite_core::activity::Activity;
use promosite_core::store::LifecycleEventBus;
use serde_json::Value;
use tracing::info;

/// Lifecycle listener that logs every dispatch.
///
/// The bus fires twice per mutation (before and after the store flush);
/// this listener simply records both so operators can follow content
/// changes in the log stream.
pub struct TracingEventBus;

impl LifecycleEventBus for TracingEventBus {
    fn dispatch(&self, event: &str, activity: &Activity, context: &Value) {
        info!(
            event,
            activity_id = activity.id,
            slug = %activity.slug,
            status = %activity.status,
            context = %context,
            "lifecycle event"
        );
    }
}
