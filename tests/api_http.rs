// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/news   (envelope shape, default page size, filters, 422)
// - GET /api/sources

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tempfile::TempDir;
use tower::ServiceExt as _; // for `oneshot`

use news_aggregator::api::{self, AppState};
use news_aggregator::ingest::types::NewArticle;
use news_aggregator::store::NewsStore;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn article(url: &str, title: &str, source: &str, author: Option<&str>) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        url: url.to_string(),
        source: source.to_string(),
        description: Some("d".to_string()),
        author: author.map(str::to_string),
    }
}

/// Build the same Router the binary uses, over a seeded temp store.
async fn test_router() -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("news.db").display());
    let store = NewsStore::open(&url).await.expect("open store");
    store.migrate().await.expect("migrate");

    store
        .insert_missing(&[
            article("http://s/1", "Bitcoin hits record", "TechCrunch", Some("Jane Doe")),
            article("http://s/2", "Markets wrap", "The Guardian", Some("By Alex Hern")),
            article("http://s/3", "Bitcoin miners expand", "The Guardian", None),
        ])
        .await
        .expect("seed");

    (dir, api::router(AppState { store }))
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = router.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn health_returns_200() {
    let (_dir, app) = test_router().await;

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn news_returns_the_enveloped_page() {
    let (_dir, app) = test_router().await;
    let (status, v) = get_json(app, "/api/news").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["error"], false);

    let content = &v["Content"];
    assert_eq!(content["current_page"], 1);
    assert_eq!(content["per_page"], 25);
    assert_eq!(content["total"], 3);

    let data = content["data"].as_array().expect("data array");
    assert_eq!(data.len(), 3);
    for article in data {
        for key in [
            "id",
            "title",
            "url",
            "source",
            "description",
            "author",
            "created_at",
            "updated_at",
        ] {
            assert!(article.get(key).is_some(), "missing '{key}'");
        }
    }
}

#[tokio::test]
async fn news_filters_combine_case_insensitively() {
    let (_dir, app) = test_router().await;
    let (status, v) = get_json(app, "/api/news?title=bitcoin&source=guardian").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["Content"]["total"], 1);
    assert_eq!(v["Content"]["data"][0]["url"], "http://s/3");
}

#[tokio::test]
async fn news_respects_page_size_and_page() {
    let (_dir, app) = test_router().await;
    let (status, v) = get_json(app, "/api/news?pageSize=2&page=2").await;

    assert_eq!(status, StatusCode::OK);
    let content = &v["Content"];
    assert_eq!(content["current_page"], 2);
    assert_eq!(content["per_page"], 2);
    assert_eq!(content["last_page"], 2);
    assert_eq!(content["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_page_size_is_a_422_naming_the_field() {
    let (_dir, app) = test_router().await;
    let (status, v) = get_json(app, "/api/news?pageSize=150").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"], true);
    assert!(v.get("Content").is_none(), "422 must not carry Content");
    assert!(v["errors"].get("pageSize").is_some(), "field detail missing");
}

#[tokio::test]
async fn empty_page_size_falls_back_to_the_default() {
    let (_dir, app) = test_router().await;
    let (status, v) = get_json(app, "/api/news?pageSize=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["Content"]["per_page"], 25);
}

#[tokio::test]
async fn sources_lists_distinct_labels_once() {
    let (_dir, app) = test_router().await;
    let (status, v) = get_json(app, "/api/sources").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["error"], false);

    let data = v["Content"]["data"].as_array().expect("data array");
    let labels: Vec<&str> = data.iter().filter_map(|s| s["source"].as_str()).collect();
    assert_eq!(labels, vec!["TechCrunch", "The Guardian"]);
}
