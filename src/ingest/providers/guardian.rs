// src/ingest/providers/guardian.rs
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::IngestError;
use crate::ingest::config::SourceConfig;
use crate::ingest::types::{FetchJob, NewArticle, SourceAdapter};

const DEFAULT_ENDPOINT: &str = "https://content.guardianapis.com/search";

#[derive(Debug, Deserialize)]
struct Payload {
    response: Inner,
}

#[derive(Debug, Deserialize)]
struct Inner {
    results: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "webTitle")]
    web_title: Option<String>,
    #[serde(rename = "webUrl")]
    web_url: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    #[serde(rename = "webTitle")]
    web_title: Option<String>,
}

pub struct GuardianAdapter {
    config: SourceConfig,
}

impl GuardianAdapter {
    pub const KEY: &'static str = "the_guardian";

    pub fn new(config: SourceConfig) -> Arc<dyn SourceAdapter> {
        Arc::new(Self { config })
    }
}

/// Contributor tags become a single byline: empty when nobody is credited,
/// otherwise "By A And B".
fn byline(tags: &[Tag]) -> String {
    let names: Vec<&str> = tags
        .iter()
        .filter_map(|t| t.web_title.as_deref())
        .collect();
    if names.is_empty() {
        return String::new();
    }
    format!("By {}", names.join(" And "))
}

impl SourceAdapter for GuardianAdapter {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        "The Guardian"
    }

    fn plan_fetch(&self) -> Result<FetchJob, IngestError> {
        let api_key = self.config.api_key().ok_or_else(|| {
            IngestError::config(
                self.name(),
                "the API key is missing; set THEGUARDIAN_API_KEY or the_guardian.api_key",
            )
        })?;

        if let Some(format) = self.config.param("format") {
            if !format.is_empty() && !format.contains("json") {
                return Err(IngestError::config(
                    self.name(),
                    "only the 'json' response format is supported",
                ));
            }
        }

        if self.config.param("callback").is_some_and(|v| !v.is_empty()) {
            return Err(IngestError::config(
                self.name(),
                "the 'callback' parameter is not supported; remove it",
            ));
        }

        // Author attribution is derived from contributor tags, so the fetch
        // must ask for them.
        let has_contributor = self
            .config
            .param("show-tags")
            .map(|v| v.contains("contributor"))
            .unwrap_or(false);
        if !has_contributor {
            return Err(IngestError::config(
                self.name(),
                "the 'show-tags' parameter must include 'contributor'",
            ));
        }

        let mut params: Vec<(String, String)> = self
            .config
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.to_query_value()))
            .collect();
        params.push(("api-key".to_string(), api_key.to_string()));

        Ok(FetchJob {
            source_key: Self::KEY.to_string(),
            endpoint: self.config.endpoint_or(DEFAULT_ENDPOINT),
            params,
        })
    }

    fn normalize(&self, payload: &Value) -> Result<Vec<NewArticle>, IngestError> {
        let parsed: Payload = serde_json::from_value(payload.clone())
            .map_err(|e| IngestError::normalization(self.name(), e.to_string()))?;

        let mut out = Vec::with_capacity(parsed.response.results.len());
        for item in parsed.response.results {
            // The canonical dedup key is the normalized `url`, which for the
            // Guardian is always `webUrl`.
            let (Some(url), Some(title)) = (item.web_url, item.web_title) else {
                tracing::warn!(
                    provider = self.name(),
                    "skipping article without webUrl or webTitle"
                );
                continue;
            };
            out.push(NewArticle {
                title,
                url,
                source: self.name().to_string(),
                description: None,
                author: Some(byline(&item.tags)),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag {
            web_title: Some(name.to_string()),
        }
    }

    #[test]
    fn byline_joins_contributors_with_and() {
        assert_eq!(byline(&[]), "");
        assert_eq!(byline(&[tag("Alex Hern")]), "By Alex Hern");
        assert_eq!(
            byline(&[tag("Alex Hern"), tag("Dan Milmo")]),
            "By Alex Hern And Dan Milmo"
        );
    }
}
