//! PostgreSQL repository for analysis rows.
//!
//! One table, append-only from the service's point of view: rows are written
//! by `analyze` and read back by `search`, never updated or deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

use crate::llm::Sentiment;

/// A stored analysis row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Analysis {
    pub id: i64,
    pub text: String,
    pub summary: String,
    pub sentiment: String,
    /// Keyword → frequency map.
    pub keywords: serde_json::Value,
    /// Title, topics and text statistics.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields of a row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub text: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub keywords: serde_json::Value,
    pub metadata: serde_json::Value,
}

/// Conjunctive search filter with paging.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Case-insensitive substring over text, summary and keywords.
    pub keyword: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub limit: i64,
    pub offset: i64,
}

/// One page of results plus the total count over the same filter.
#[derive(Debug)]
pub struct SearchPage {
    pub results: Vec<Analysis>,
    pub total: i64,
}

const COLUMNS: &str = "id, text, summary, sentiment, keywords, metadata, created_at";

/// Every filter is optional; a NULL bind disables its clause, so one
/// prepared statement covers all filter combinations.
const FILTER_CLAUSE: &str = "($1::text IS NULL \
     OR text ILIKE $1 \
     OR summary ILIKE $1 \
     OR keywords::text ILIKE $1) \
     AND ($2::text IS NULL OR sentiment = $2)";

/// Repository over a shared connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AnalysisStore {
    pool: PgPool,
}

impl AnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and its indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS analyses (
                id          BIGSERIAL PRIMARY KEY,
                text        TEXT NOT NULL,
                summary     TEXT NOT NULL,
                sentiment   TEXT NOT NULL,
                keywords    JSONB NOT NULL DEFAULT '{}'::jsonb,
                metadata    JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_sentiment ON analyses (sentiment)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses (created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert one row and return it as stored.
    pub async fn insert(&self, new: NewAnalysis) -> Result<Analysis, sqlx::Error> {
        let sql = format!(
            "INSERT INTO analyses (text, summary, sentiment, keywords, metadata)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let row: Analysis = sqlx::query_as(&sql)
            .bind(&new.text)
            .bind(&new.summary)
            .bind(new.sentiment.as_str())
            .bind(&new.keywords)
            .bind(&new.metadata)
            .fetch_one(&self.pool)
            .await?;

        debug!(id = row.id, sentiment = %row.sentiment, "analysis stored");
        Ok(row)
    }

    /// Page of rows matching the filter, newest first, plus the total count.
    pub async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, sqlx::Error> {
        let pattern = filter.keyword.as_deref().map(like_pattern);
        let sentiment = filter.sentiment.map(|s| s.as_str());

        let select_sql = format!(
            "SELECT {COLUMNS} FROM analyses
             WHERE {FILTER_CLAUSE}
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let results: Vec<Analysis> = sqlx::query_as(&select_sql)
            .bind(pattern.as_deref())
            .bind(sentiment)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM analyses WHERE {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(pattern.as_deref())
            .bind(sentiment)
            .fetch_one(&self.pool)
            .await?;

        debug!(
            returned = results.len(),
            total,
            keyword = ?filter.keyword,
            sentiment = ?filter.sentiment,
            "search executed"
        );
        Ok(SearchPage { results, total })
    }
}

/// Wrap a needle in `%…%`, escaping LIKE metacharacters so user input
/// matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
