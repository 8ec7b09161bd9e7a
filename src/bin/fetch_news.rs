//! `fetch-news` — one-shot ingestion trigger.
//!
//! Plans a fetch for every enabled source and hands the jobs to the
//! background worker pool. Dispatch itself never blocks on task
//! completion; the process then drains the in-process queue before
//! exiting, since the workers die with it.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_aggregator::ingest::worker::{spawn_workers, ReqwestFetcher};
use news_aggregator::ingest::{self, config as source_config, AdapterRegistry};
use news_aggregator::store::NewsStore;

const WORKERS: usize = 4;

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
    let _ = dotenvy::dotenv();

    init_tracing();

    let sources = source_config::load_default().context("loading source configuration")?;
    let registry = Arc::new(AdapterRegistry::from_config(&sources));

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data/news.db".to_string());
    let store = NewsStore::open(&database_url)
        .await
        .context("opening article store")?;
    store.migrate().await.context("migrating article store")?;

    let pool = spawn_workers(
        WORKERS,
        Arc::clone(&registry),
        store,
        Arc::new(ReqwestFetcher::new()),
    );

    let summary = ingest::run_all(&registry, &pool.queue()).await;
    for (source, error) in &summary.failures {
        tracing::warn!(%source, %error, "source skipped");
    }
    tracing::info!(
        dispatched = summary.dispatched.len(),
        failed = summary.failures.len(),
        "dispatch complete"
    );

    // All dispatching is done; wait for the in-process workers to drain.
    pool.shutdown().await;
    Ok(())
}
