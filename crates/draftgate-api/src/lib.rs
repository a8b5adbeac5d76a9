//! draftgate API: REST endpoints over the generation orchestrator
//!
//! ```text
//! /api/ai/*     ─▶ GenerationOrchestrator ─▶ ModelGateway (HTTP or scenario)
//! /api/admin/*  ─▶ telemetry / settings / alerts / audit
//! /metrics      ─▶ Prometheus text
//! ```
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod model_client;
pub mod state;

pub use config::AppConfig;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use draftgate_ops::DEFAULT_WINDOW_MINUTES;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/ai/generate-draft", post(handlers::generate_draft))
        .route("/api/ai/regenerate-draft-paragraph", post(handlers::regenerate_paragraph))
        .route("/api/ai/chat", post(handlers::chat))
        .route("/api/ai/compliance-check", post(handlers::compliance_check))
        .route(
            "/api/ai/generate/interactive-article",
            post(handlers::generate_interactive_article),
        )
        .route("/api/admin/stats", get(handlers::stats))
        .route(
            "/api/admin/ai-draft/settings",
            get(handlers::get_settings).put(handlers::update_draft_settings),
        )
        .route(
            "/api/admin/ai/news/settings",
            get(handlers::get_settings).put(handlers::update_news_settings),
        )
        .route("/api/admin/alerts", get(handlers::list_alerts))
        .route("/api/admin/alerts/summary", get(handlers::alert_summary))
        .route("/api/admin/alerts/test", post(handlers::trigger_test_alert))
        .route("/api/admin/audit", get(handlers::list_audit))
        .route("/api/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Evaluate the default alert window every `every` until `shutdown` fires.
pub fn spawn_alert_tick(
    state: &AppState,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let alerts = state.orchestrator.alerts().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let summary = alerts.evaluate(DEFAULT_WINDOW_MINUTES);
                    tracing::debug!(
                        samples = summary.total_samples,
                        failure_rate = summary.failure_rate,
                        warning = summary.active_alerts.warning,
                        critical = summary.active_alerts.critical,
                        "alert tick"
                    );
                }
            }
        }
    })
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.addr.clone();
    let tick = config.alert_tick;
    let test_mode = config.test_mode;
    let state = AppState::from_config(config)?;

    let shutdown = CancellationToken::new();
    let ticker = spawn_alert_tick(&state, tick, shutdown.clone());

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, test_mode, "draftgate API listening");
    if test_mode {
        tracing::warn!("test mode enabled: x-ai-draft-scenario header is honored");
    }

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    ticker.await?;
    Ok(())
}
