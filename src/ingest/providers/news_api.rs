// src/ingest/providers/news_api.rs
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::IngestError;
use crate::ingest::config::SourceConfig;
use crate::ingest::types::{FetchJob, NewArticle, SourceAdapter};

const DEFAULT_ENDPOINT: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Deserialize)]
struct Payload {
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    name: Option<String>,
}

pub struct NewsApiAdapter {
    config: SourceConfig,
}

impl NewsApiAdapter {
    pub const KEY: &'static str = "news_api";

    pub fn new(config: SourceConfig) -> Arc<dyn SourceAdapter> {
        Arc::new(Self { config })
    }
}

impl SourceAdapter for NewsApiAdapter {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }

    fn plan_fetch(&self) -> Result<FetchJob, IngestError> {
        let api_key = self.config.api_key().ok_or_else(|| {
            IngestError::config(
                self.name(),
                "the API key is missing; set NEWSAPI_API_KEY or news_api.api_key",
            )
        })?;

        // NewsAPI rejects requests without a search query.
        let q_present = self
            .config
            .param("q")
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        if !q_present {
            return Err(IngestError::config(
                self.name(),
                "the 'q' parameter is required and cannot be empty",
            ));
        }

        let mut params: Vec<(String, String)> = self
            .config
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.to_query_value()))
            .collect();
        params.push(("apiKey".to_string(), api_key.to_string()));

        Ok(FetchJob {
            source_key: Self::KEY.to_string(),
            endpoint: self.config.endpoint_or(DEFAULT_ENDPOINT),
            params,
        })
    }

    fn normalize(&self, payload: &Value) -> Result<Vec<NewArticle>, IngestError> {
        let parsed: Payload = serde_json::from_value(payload.clone())
            .map_err(|e| IngestError::normalization(self.name(), e.to_string()))?;

        let mut out = Vec::with_capacity(parsed.articles.len());
        for item in parsed.articles {
            let (Some(url), Some(title)) = (item.url, item.title) else {
                tracing::warn!(provider = self.name(), "skipping article without url or title");
                continue;
            };
            out.push(NewArticle {
                title,
                url,
                source: item
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| self.name().to_string()),
                description: item.description,
                author: item.author,
            });
        }
        Ok(out)
    }
}
