use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use promosite_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("promosite=info".parse()?),
        )
        .json()
        .init();

    let cfg = promosite_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure the data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/promosite.db", cfg.data_dir);
    let db = promosite_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    let state = Arc::new(AppState::new(db, cfg.clone()));

    // Lifecycle sweep loop (scheduled publish, expired archive).
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            promosite_server::scheduler::run_scheduler_loop(state).await;
        });
    }

    // Daily event retention cleanup at midnight UTC.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            promosite_server::scheduler::run_retention_loop(state).await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = promosite_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "promosite listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
