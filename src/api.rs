use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::store::{NewsFilter, NewsStore, MAX_PAGE_SIZE};

const MAX_FILTER_LEN: usize = 255;

#[derive(Clone)]
pub struct AppState {
    pub store: NewsStore,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(get_news))
        .route("/api/sources", get(get_sources))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Raw query strings. Everything is validated by hand so bad input becomes
/// a 422 with field detail instead of an opaque 400 from the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    title: Option<String>,
    source: Option<String>,
    author: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourcesQuery {
    page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub error: bool,
    #[serde(rename = "Content")]
    pub content: T,
}

/// 422 body: field name to the list of complaints about it, no `Content`.
#[derive(Debug, Serialize)]
pub struct ValidationErrors {
    pub error: bool,
    pub message: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

fn parse_news_query(q: NewsQuery) -> Result<NewsFilter, ValidationErrors> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (field, value) in [("title", &q.title), ("source", &q.source), ("author", &q.author)] {
        if let Some(v) = value {
            if v.chars().count() > MAX_FILTER_LEN {
                errors.entry(field.to_string()).or_default().push(format!(
                    "The {field} may not be greater than {MAX_FILTER_LEN} characters."
                ));
            }
        }
    }

    // Absent or empty pageSize falls back to the store default, not to
    // "no limit"; anything else must be an integer in range.
    let page_size = match q.page_size.as_deref() {
        None | Some("") => None,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Some(n),
            _ => {
                errors.entry("pageSize".to_string()).or_default().push(format!(
                    "The pageSize must be an integer between 1 and {MAX_PAGE_SIZE}."
                ));
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(ValidationErrors {
            error: true,
            message: "The given data was invalid.".to_string(),
            errors,
        });
    }

    Ok(NewsFilter {
        title: q.title.filter(|s| !s.is_empty()),
        source: q.source.filter(|s| !s.is_empty()),
        author: q.author.filter(|s| !s.is_empty()),
        page: parse_page(q.page.as_deref()),
        page_size,
    })
}

/// `page` is lenient: anything that is not a positive integer means page 1.
fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

async fn get_news(State(state): State<AppState>, Query(q): Query<NewsQuery>) -> Response {
    let filter = match parse_news_query(q) {
        Ok(filter) => filter,
        Err(errors) => return (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response(),
    };

    match state.store.search(&filter).await {
        Ok(page) => Json(Envelope {
            error: false,
            content: page,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_sources(State(state): State<AppState>, Query(q): Query<SourcesQuery>) -> Response {
    match state.store.sources(parse_page(q.page.as_deref())).await {
        Ok(page) => Json(Envelope {
            error: false,
            content: page,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: sqlx::Error) -> Response {
    tracing::error!(error = %e, "store query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": true, "message": "internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_when_absent_or_empty() {
        for raw in [None, Some(String::new())] {
            let q = NewsQuery {
                page_size: raw,
                ..NewsQuery::default()
            };
            let filter = parse_news_query(q).unwrap();
            assert_eq!(filter.page_size, None);
        }
    }

    #[test]
    fn out_of_range_page_size_is_rejected_with_field_detail() {
        for raw in ["150", "0", "-5", "abc"] {
            let q = NewsQuery {
                page_size: Some(raw.to_string()),
                ..NewsQuery::default()
            };
            let err = parse_news_query(q).unwrap_err();
            assert!(err.error);
            assert!(err.errors.contains_key("pageSize"), "raw={raw}");
        }
    }

    #[test]
    fn overlong_filter_is_rejected() {
        let q = NewsQuery {
            title: Some("x".repeat(256)),
            ..NewsQuery::default()
        };
        let err = parse_news_query(q).unwrap_err();
        assert!(err.errors.contains_key("title"));
    }

    #[test]
    fn lenient_page_parsing_falls_back_to_one() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("seven")), 1);
        assert_eq!(parse_page(Some("3")), 3);
    }
}
