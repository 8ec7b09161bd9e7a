// src/ingest/providers/mod.rs
pub mod guardian;
pub mod news_api;
pub mod nytimes;

use std::sync::Arc;

use crate::ingest::config::SourceConfig;
use crate::ingest::types::SourceAdapter;

pub use guardian::GuardianAdapter;
pub use news_api::NewsApiAdapter;
pub use nytimes::NyTimesAdapter;

pub type AdapterFactory = fn(SourceConfig) -> Arc<dyn SourceAdapter>;

/// Explicit constructor registry replacing config-driven class resolution:
/// every supported source key maps to its adapter constructor. A config
/// entry whose key is absent here is skipped with a warning.
pub const FACTORIES: &[(&str, AdapterFactory)] = &[
    (NewsApiAdapter::KEY, NewsApiAdapter::new),
    (GuardianAdapter::KEY, GuardianAdapter::new),
    (NyTimesAdapter::KEY, NyTimesAdapter::new),
];
