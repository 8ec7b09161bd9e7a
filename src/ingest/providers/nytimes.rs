// src/ingest/providers/nytimes.rs
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::IngestError;
use crate::ingest::config::SourceConfig;
use crate::ingest::types::{FetchJob, NewArticle, SourceAdapter};

const DEFAULT_ENDPOINT: &str = "https://api.nytimes.com/svc/news/v3/content/all/all.json";

#[derive(Debug, Deserialize)]
struct Payload {
    results: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "abstract")]
    summary: Option<String>,
    source: Option<String>,
    byline: Option<String>,
}

pub struct NyTimesAdapter {
    config: SourceConfig,
}

impl NyTimesAdapter {
    pub const KEY: &'static str = "nytimes";

    pub fn new(config: SourceConfig) -> Arc<dyn SourceAdapter> {
        Arc::new(Self { config })
    }
}

impl SourceAdapter for NyTimesAdapter {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        "New York Times"
    }

    fn plan_fetch(&self) -> Result<FetchJob, IngestError> {
        let api_key = self.config.api_key().ok_or_else(|| {
            IngestError::config(
                self.name(),
                "the API key is missing; set NYTIMES_API_KEY or nytimes.api_key",
            )
        })?;

        // The newswire endpoint takes no search parameters; only the key is
        // sent regardless of what the config carries.
        let params = vec![("api-key".to_string(), api_key.to_string())];

        Ok(FetchJob {
            source_key: Self::KEY.to_string(),
            endpoint: self.config.endpoint_or(DEFAULT_ENDPOINT),
            params,
        })
    }

    fn normalize(&self, payload: &Value) -> Result<Vec<NewArticle>, IngestError> {
        let parsed: Payload = serde_json::from_value(payload.clone())
            .map_err(|e| IngestError::normalization(self.name(), e.to_string()))?;

        let mut out = Vec::with_capacity(parsed.results.len());
        for item in parsed.results {
            let (Some(url), Some(title)) = (item.url, item.title) else {
                tracing::warn!(provider = self.name(), "skipping article without url or title");
                continue;
            };
            out.push(NewArticle {
                title,
                url,
                source: item.source.unwrap_or_else(|| self.name().to_string()),
                description: item.summary,
                author: item.byline,
            });
        }
        Ok(out)
    }
}
