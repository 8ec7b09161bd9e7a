// src/ingest/types.rs
use serde_json::Value;

use crate::error::IngestError;

/// An article candidate produced by a provider's normalizer, not yet
/// persisted. The store assigns the id and timestamps on insert.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub description: Option<String>,
    pub author: Option<String>,
}

/// A validated outbound request, ready for the worker queue.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub source_key: String,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

/// Provider-specific fetch planning and payload normalization.
///
/// `plan_fetch` validates configuration and builds the request without any
/// network I/O; the actual HTTP call happens on the worker pool, which hands
/// the raw JSON body back to `normalize`.
pub trait SourceAdapter: Send + Sync {
    /// Stable config key, e.g. `news_api`.
    fn key(&self) -> &'static str;

    /// Human-readable provider name used in logs and errors.
    fn name(&self) -> &'static str;

    fn plan_fetch(&self) -> Result<FetchJob, IngestError>;

    /// Map a raw provider payload onto canonical article candidates,
    /// preserving payload order.
    fn normalize(&self, payload: &Value) -> Result<Vec<NewArticle>, IngestError>;
}
