// src/store.rs
// Article persistence over SQLite via sqlx. The unique index on `url` is
// the dedup authority; everything else defers to it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, QueryBuilder, Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;

use crate::ingest::types::NewArticle;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;
const SOURCES_PAGE_SIZE: u32 = 100;

/// A persisted article. `id` and the timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SourceRow {
    pub source: String,
}

/// Optional substring filters combined with AND, plus pagination. A missing
/// `page_size` means the default of 25; the store clamps to [1, 100] either
/// way before paginating.
#[derive(Debug, Clone, Default)]
pub struct NewsFilter {
    pub title: Option<String>,
    pub source: Option<String>,
    pub author: Option<String>,
    pub page: u32,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    fn new(data: Vec<T>, current_page: u32, per_page: u32, total: u64) -> Self {
        let last_page = (total.div_ceil(per_page as u64) as u32).max(1);
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

#[derive(Clone)]
pub struct NewsStore {
    pool: SqlitePool,
}

impl NewsStore {
    /// Open (and create, for file URLs) the database behind `database_url`,
    /// e.g. `sqlite:data/news.db`.
    pub async fn open(database_url: &str) -> Result<Self> {
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");

        if db_path != ":memory:" && !Path::new(db_path).exists() {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::File::create(db_path)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent schema setup.
    pub async fn migrate(&self) -> Result<()> {
        let create_news_sql = r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                source TEXT NOT NULL,
                description TEXT,
                author TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#;

        let create_indexes_sql = [
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_news_url ON news (url)",
            "CREATE INDEX IF NOT EXISTS idx_news_title_url_source ON news (title, url, source)",
        ];

        sqlx::query(create_news_sql).execute(&self.pool).await?;
        for sql in create_indexes_sql {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert the candidates whose URL is not yet stored; skip the rest.
    ///
    /// One batched lookup over all candidate URLs, then one batched
    /// `INSERT OR IGNORE`. The unique `url` index remains the final
    /// authority when a concurrent run races on the same URL: the losing
    /// row is dropped without failing the batch.
    pub async fn insert_missing(
        &self,
        candidates: &[NewArticle],
    ) -> Result<InsertOutcome, sqlx::Error> {
        if candidates.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let mut lookup: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT url FROM news WHERE url IN (");
        let mut sep = lookup.separated(", ");
        for candidate in candidates {
            sep.push_bind(&candidate.url);
        }
        sep.push_unseparated(")");
        let rows = lookup.build().fetch_all(&self.pool).await?;

        // `existing` doubles as the within-batch seen set, so a payload
        // repeating its own URL also collapses to one row.
        let mut existing: HashSet<String> =
            rows.iter().map(|r| r.get::<String, _>("url")).collect();

        let mut fresh: Vec<&NewArticle> = Vec::with_capacity(candidates.len());
        let mut duplicates = 0usize;
        for candidate in candidates {
            if !existing.insert(candidate.url.clone()) {
                duplicates += 1;
                continue;
            }
            fresh.push(candidate);
        }

        if fresh.is_empty() {
            return Ok(InsertOutcome {
                inserted: 0,
                duplicates,
            });
        }

        let now = Utc::now();
        let mut insert: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "INSERT OR IGNORE INTO news (title, url, source, description, author, created_at, updated_at) ",
        );
        insert.push_values(&fresh, |mut b, candidate| {
            b.push_bind(&candidate.title)
                .push_bind(&candidate.url)
                .push_bind(&candidate.source)
                .push_bind(&candidate.description)
                .push_bind(&candidate.author)
                .push_bind(now)
                .push_bind(now);
        });
        let result = insert.build().execute(&self.pool).await?;

        Ok(InsertOutcome {
            inserted: result.rows_affected() as usize,
            duplicates,
        })
    }

    /// Filtered, paginated article listing. Filters are case-insensitive
    /// substring matches combined with AND, ordered by insertion id.
    pub async fn search(&self, filter: &NewsFilter) -> Result<Page<Article>, sqlx::Error> {
        let per_page = filter
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = filter.page.max(1);

        const WHERE_CLAUSE: &str = "(?1 IS NULL OR lower(title) LIKE '%' || lower(?1) || '%') \
             AND (?2 IS NULL OR lower(source) LIKE '%' || lower(?2) || '%') \
             AND (?3 IS NULL OR lower(author) LIKE '%' || lower(?3) || '%')";

        let count_sql = format!("SELECT COUNT(*) FROM news WHERE {WHERE_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&filter.title)
            .bind(&filter.source)
            .bind(&filter.author)
            .fetch_one(&self.pool)
            .await?;

        let rows_sql = format!(
            "SELECT id, title, url, source, description, author, created_at, updated_at \
             FROM news WHERE {WHERE_CLAUSE} ORDER BY id LIMIT ?4 OFFSET ?5"
        );
        let data = sqlx::query_as::<_, Article>(&rows_sql)
            .bind(&filter.title)
            .bind(&filter.source)
            .bind(&filter.author)
            .bind(per_page as i64)
            .bind(((page - 1) * per_page) as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(data, page, per_page, total as u64))
    }

    /// Distinct source labels at a fixed page size of 100, ignoring the
    /// article filters.
    pub async fn sources(&self, page: u32) -> Result<Page<SourceRow>, sqlx::Error> {
        let page = page.max(1);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source) FROM news")
            .fetch_one(&self.pool)
            .await?;

        let data = sqlx::query_as::<_, SourceRow>(
            "SELECT DISTINCT source FROM news ORDER BY source LIMIT ?1 OFFSET ?2",
        )
        .bind(SOURCES_PAGE_SIZE as i64)
        .bind(((page - 1) * SOURCES_PAGE_SIZE) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(data, page, SOURCES_PAGE_SIZE, total as u64))
    }
}
