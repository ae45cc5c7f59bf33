//! Background loops: lifecycle sweeps and event retention cleanup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::state::AppState;

/// One scheduler iteration: publish due scheduled activities, archive
/// expired published ones. Returns (published, archived) counts.
pub async fn process_once(state: &Arc<AppState>) -> anyhow::Result<(usize, usize)> {
    let now = Utc::now();
    let published = state.lifecycle.process_scheduled(now).await?;
    let archived = state.lifecycle.process_expired(now).await?;
    Ok((published, archived))
}

/// Fixed-interval sweep loop. A failed iteration is logged and the loop
/// keeps ticking.
pub async fn run_scheduler_loop(state: Arc<AppState>) {
    let tick = state.config.scheduler_tick_seconds;
    info!(tick_seconds = tick, "Lifecycle scheduler started");
    let mut interval = tokio::time::interval(Duration::from_secs(tick));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = process_once(&state).await {
            error!(error = %err, "scheduler iteration failed");
        }
    }
}

/// Daily retention loop: sleeps until the next UTC midnight, then removes
/// events older than `config.retention_days`.
pub async fn run_retention_loop(state: Arc<AppState>) {
    loop {
        let now = Utc::now();
        let tomorrow = now.date_naive() + chrono::Duration::days(1);
        let next_midnight = match tomorrow.and_hms_opt(0, 0, 0) {
            Some(t) => t.and_utc(),
            None => {
                error!("retention loop could not compute next midnight");
                return;
            }
        };
        let secs_until = (next_midnight - now).num_seconds().max(1) as u64;
        tokio::time::sleep(Duration::from_secs(secs_until)).await;

        match state
            .collector
            .cleanup_events(state.config.retention_days)
            .await
        {
            Ok(removed) => info!(removed, "retention cleanup complete"),
            Err(e) => error!(error = %e, "retention cleanup failed"),
        }
    }
}
