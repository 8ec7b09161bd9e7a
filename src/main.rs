//! News Aggregation Service — Binary Entrypoint
//! Boots the Axum read API over the article store, wiring routes, shared
//! state and the Prometheus recorder.
//!
//! Ingestion is triggered separately by the `fetch-news` binary.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_aggregator::api::{self, AppState};
use news_aggregator::metrics::Metrics;
use news_aggregator::store::NewsStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let metrics = Metrics::init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/news.db".to_string());
    let store = NewsStore::open(&database_url)
        .await
        .context("opening article store")?;
    store.migrate().await.context("migrating article store")?;

    let router = api::router(AppState { store }).merge(metrics.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "news read API listening");

    axum::serve(listener, router).await.context("serving")?;
    Ok(())
}
