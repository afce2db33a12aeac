//! Career Scout — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use career_scout::ai::build_chat_client;
use career_scout::api::{create_router_with, AppState};
use career_scout::config::ai::AiConfig;
use career_scout::metrics::Metrics;
use career_scout::search::{config::SearchConfig, serp::SerpClient};

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments. This enables
    // SERP_API_KEY / AZURE_OPENAI_* overrides from .env.
    let _ = dotenvy::dotenv();
    init_tracing();

    let search_cfg = SearchConfig::load();
    let ai_cfg = AiConfig::load();
    tracing::info!(
        ai_enabled = ai_cfg.is_complete(),
        num_results = search_cfg.num_results,
        "configuration loaded"
    );

    // Prometheus recorder must be installed before any counter is touched.
    let metrics = Metrics::init(ai_cfg.daily_limit);

    let state = AppState::new(
        Arc::new(SerpClient::from_config(&search_cfg)),
        build_chat_client(&ai_cfg),
    );
    let router = create_router_with(state).merge(metrics.router());

    let host = std::env::var(ENV_HOST).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var(ENV_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "career-scout listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
