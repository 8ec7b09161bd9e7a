// src/ingest/worker.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::IngestError;
use crate::ingest::types::FetchJob;
use crate::ingest::{normalize_and_persist, AdapterRegistry};
use crate::store::NewsStore;

const QUEUE_CAPACITY: usize = 64;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// How much raw payload to keep in a diagnostic log line.
const PAYLOAD_SNIPPET_CHARS: usize = 2048;

/// Outbound HTTP seam; swapped for a stub in tests.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        source: &str,
    ) -> Result<Value, IngestError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        source: &str,
    ) -> Result<Value, IngestError> {
        let resp = self
            .client
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| IngestError::upstream(source, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::upstream(
                source,
                format!("unexpected status {status}"),
            ));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| IngestError::normalization(source, format!("body is not JSON: {e}")))
    }
}

/// Sending half of the job queue. Cloneable; the queue closes once every
/// clone and the owning pool's copy are dropped.
#[derive(Clone)]
pub struct FetchQueue {
    tx: mpsc::Sender<FetchJob>,
}

impl FetchQueue {
    pub async fn dispatch(&self, job: FetchJob) -> Result<(), IngestError> {
        let source = job.source_key.clone();
        self.tx
            .send(job)
            .await
            .map_err(|_| IngestError::upstream(source, "fetch queue is closed"))
    }
}

pub struct WorkerPool {
    queue: FetchQueue,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn queue(&self) -> FetchQueue {
        self.queue.clone()
    }

    /// Close the queue and wait for in-flight jobs to finish. Any
    /// externally held `FetchQueue` clones must be dropped first or the
    /// workers will keep waiting for more jobs.
    pub async fn shutdown(self) {
        drop(self.queue);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Spawn `count` workers consuming fetch jobs from a shared queue. Each job
/// is independent: GET the endpoint, decode JSON, normalize, persist.
pub fn spawn_workers(
    count: usize,
    registry: Arc<AdapterRegistry>,
    store: NewsStore,
    fetcher: Arc<dyn HttpFetch>,
) -> WorkerPool {
    let (tx, rx) = mpsc::channel::<FetchJob>(QUEUE_CAPACITY);
    let rx = Arc::new(Mutex::new(rx));

    let mut handles = Vec::with_capacity(count);
    for worker_id in 0..count {
        let rx = Arc::clone(&rx);
        let registry = Arc::clone(&registry);
        let store = store.clone();
        let fetcher = Arc::clone(&fetcher);
        handles.push(tokio::spawn(async move {
            loop {
                let job = rx.lock().await.recv().await;
                let Some(job) = job else { break };
                run_job(&job, &registry, &store, fetcher.as_ref(), worker_id).await;
            }
        }));
    }

    WorkerPool {
        queue: FetchQueue { tx },
        handles,
    }
}

async fn run_job(
    job: &FetchJob,
    registry: &AdapterRegistry,
    store: &NewsStore,
    fetcher: &dyn HttpFetch,
    worker_id: usize,
) {
    let Some(adapter) = registry.get(&job.source_key) else {
        tracing::error!(source = %job.source_key, "job references an unregistered source");
        return;
    };

    let t0 = std::time::Instant::now();
    let mut attempt = 1u32;
    let payload = loop {
        match fetcher
            .get_json(&job.endpoint, &job.params, adapter.name())
            .await
        {
            Ok(payload) => break payload,
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                counter!("ingest_upstream_errors_total").increment(1);
                tracing::warn!(
                    provider = adapter.name(),
                    worker = worker_id,
                    attempt,
                    error = %e,
                    "upstream fetch failed, retrying"
                );
                tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                match &e {
                    IngestError::Upstream { .. } => {
                        counter!("ingest_upstream_errors_total").increment(1)
                    }
                    IngestError::Normalization { .. } => {
                        counter!("ingest_normalize_errors_total").increment(1)
                    }
                    _ => {}
                }
                tracing::error!(
                    provider = adapter.name(),
                    worker = worker_id,
                    attempt,
                    error = %e,
                    "fetch job abandoned"
                );
                return;
            }
        }
    };
    histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    if let Err(e) = normalize_and_persist(adapter.as_ref(), &payload, store).await {
        if matches!(e, IngestError::Normalization { .. }) {
            counter!("ingest_normalize_errors_total").increment(1);
            // Keep a slice of the raw payload around for diagnosis.
            let raw = payload.to_string();
            let snippet: String = raw.chars().take(PAYLOAD_SNIPPET_CHARS).collect();
            tracing::error!(
                provider = adapter.name(),
                error = %e,
                payload = %snippet,
                "normalization failed"
            );
        } else {
            tracing::error!(provider = adapter.name(), error = %e, "persisting batch failed");
        }
    }
}
