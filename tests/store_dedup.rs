// tests/store_dedup.rs
//
// Idempotence of the insert-if-absent rule: the unique url index plus the
// batched existing-url lookup must make re-ingestion a no-op.

use news_aggregator::ingest::types::NewArticle;
use news_aggregator::store::{NewsFilter, NewsStore};
use tempfile::TempDir;

async fn temp_store() -> (TempDir, NewsStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("news.db").display());
    let store = NewsStore::open(&url).await.expect("open store");
    store.migrate().await.expect("migrate");
    (dir, store)
}

fn article(url: &str, title: &str) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        url: url.to_string(),
        source: "TestWire".to_string(),
        description: None,
        author: None,
    }
}

#[tokio::test]
async fn inserting_the_same_batch_twice_changes_nothing() {
    let (_dir, store) = temp_store().await;
    let batch = vec![article("http://t/1", "one"), article("http://t/2", "two")];

    let first = store.insert_missing(&batch).await.unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.duplicates, 0);

    let second = store.insert_missing(&batch).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 2);

    let page = store.search(&NewsFilter::default()).await.unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn a_batch_repeating_its_own_url_collapses_to_one_row() {
    let (_dir, store) = temp_store().await;
    let batch = vec![
        article("http://t/1", "first copy"),
        article("http://t/1", "second copy"),
    ];

    let outcome = store.insert_missing(&batch).await.unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.duplicates, 1);

    let page = store.search(&NewsFilter::default()).await.unwrap();
    assert_eq!(page.total, 1);
    // First occurrence wins.
    assert_eq!(page.data[0].title, "first copy");
}

#[tokio::test]
async fn overlapping_batches_only_add_the_new_urls() {
    let (_dir, store) = temp_store().await;

    store
        .insert_missing(&[article("http://t/1", "one")])
        .await
        .unwrap();

    let outcome = store
        .insert_missing(&[
            article("http://t/1", "one again"),
            article("http://t/2", "two"),
        ])
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.duplicates, 1);

    let page = store.search(&NewsFilter::default()).await.unwrap();
    assert_eq!(page.total, 2);
    let titles: Vec<&str> = page.data.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["one", "two"]);
}

#[tokio::test]
async fn an_empty_batch_is_a_no_op() {
    let (_dir, store) = temp_store().await;
    let outcome = store.insert_missing(&[]).await.unwrap();
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.duplicates, 0);
}
