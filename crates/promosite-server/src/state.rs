use std::sync::Arc;

use promosite_core::collector::StatsCollector;
use promosite_core::config::Config;
use promosite_core::lifecycle::ActivityLifecycle;
use promosite_core::templating::TemplateEngine;
use promosite_duckdb::DuckDbBackend;

use crate::bus::TracingEventBus;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// The DuckDB backend serves all four storage ports; one `Arc` of it is
/// cloned into the collector, the lifecycle, and the template engine so
/// every service shares the single embedded connection.
pub struct AppState {
    pub db: Arc<DuckDbBackend>,
    pub config: Arc<Config>,
    pub collector: StatsCollector,
    pub lifecycle: Arc<ActivityLifecycle>,
    pub templates: TemplateEngine,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let collector = StatsCollector::new(db.clone(), db.clone(), db.clone());
        let lifecycle = Arc::new(ActivityLifecycle::new(
            db.clone(),
            Arc::new(TracingEventBus),
        ));
        let templates = TemplateEngine::new(db.clone(), lifecycle.clone());
        Self {
            db,
            config: Arc::new(config),
            collector,
            lifecycle,
            templates,
        }
    }
}
