// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;
pub mod worker;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::error::IngestError;
use crate::ingest::config::SourcesConfig;
use crate::ingest::providers::FACTORIES;
use crate::ingest::types::SourceAdapter;
use crate::ingest::worker::FetchQueue;
use crate::store::{InsertOutcome, NewsStore};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_articles_total",
            "Article candidates produced by normalizers."
        );
        describe_counter!("ingest_inserted_total", "New articles persisted.");
        describe_counter!(
            "ingest_duplicate_total",
            "Candidates dropped because their URL was already stored."
        );
        describe_counter!(
            "ingest_config_errors_total",
            "Sources skipped due to invalid configuration."
        );
        describe_counter!("ingest_upstream_errors_total", "Provider fetch failures.");
        describe_counter!(
            "ingest_normalize_errors_total",
            "Payloads the provider adapter could not understand."
        );
        describe_counter!("ingest_runs_total", "Orchestrator runs.");
        describe_histogram!("ingest_fetch_ms", "Provider fetch time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts of the last orchestrator run.");
    });
}

struct RegisteredSource {
    key: String,
    enabled: bool,
    adapter: Arc<dyn SourceAdapter>,
}

/// The set of adapters built from configuration at startup. The
/// orchestrator and workers only ever see `dyn SourceAdapter` through this.
pub struct AdapterRegistry {
    sources: Vec<RegisteredSource>,
}

impl AdapterRegistry {
    pub fn from_config(config: &SourcesConfig) -> Self {
        let mut sources = Vec::new();
        for (key, source_cfg) in &config.sources {
            let Some((_, factory)) = FACTORIES.iter().find(|(k, _)| *k == key.as_str()) else {
                tracing::warn!(source = %key, "no adapter registered for configured source");
                continue;
            };
            sources.push(RegisteredSource {
                key: key.clone(),
                enabled: source_cfg.enabled,
                adapter: factory(source_cfg.clone()),
            });
        }
        Self { sources }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.sources
            .iter()
            .find(|s| s.key == key)
            .map(|s| Arc::clone(&s.adapter))
    }

    pub fn enabled(&self) -> impl Iterator<Item = (&str, &Arc<dyn SourceAdapter>)> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| (s.key.as_str(), &s.adapter))
    }
}

/// Outcome of one orchestrator pass. Failures are per-source; a bad source
/// never stops the others.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub dispatched: Vec<String>,
    pub failures: Vec<(String, IngestError)>,
}

/// Plan and enqueue a fetch for every enabled source. Returns after
/// dispatching; the HTTP work happens on the worker pool.
pub async fn run_all(registry: &AdapterRegistry, queue: &FetchQueue) -> RunSummary {
    ensure_metrics_described();
    counter!("ingest_runs_total").increment(1);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    let mut summary = RunSummary::default();
    for (key, adapter) in registry.enabled() {
        match adapter.plan_fetch() {
            Ok(job) => match queue.dispatch(job).await {
                Ok(()) => summary.dispatched.push(key.to_string()),
                Err(e) => {
                    tracing::error!(source = %key, error = %e, "fetch queue rejected job");
                    summary.failures.push((key.to_string(), e));
                }
            },
            Err(e) => {
                counter!("ingest_config_errors_total").increment(1);
                tracing::warn!(source = %key, error = %e, "source misconfigured, skipping");
                summary.failures.push((key.to_string(), e));
            }
        }
    }
    summary
}

/// Normalize a raw provider payload and persist the candidates under the
/// insert-if-absent rule. Safe to re-run on the same payload.
pub async fn normalize_and_persist(
    adapter: &dyn SourceAdapter,
    payload: &Value,
    store: &NewsStore,
) -> Result<InsertOutcome, IngestError> {
    let candidates = adapter.normalize(payload)?;
    counter!("ingest_articles_total").increment(candidates.len() as u64);

    let outcome = store.insert_missing(&candidates).await?;
    counter!("ingest_inserted_total").increment(outcome.inserted as u64);
    counter!("ingest_duplicate_total").increment(outcome.duplicates as u64);

    tracing::info!(
        provider = adapter.name(),
        candidates = candidates.len(),
        inserted = outcome.inserted,
        duplicates = outcome.duplicates,
        "persisted batch"
    );
    Ok(outcome)
}
