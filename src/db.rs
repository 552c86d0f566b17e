use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

use crate::error::StoreError;

#[derive(Debug, Clone, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    summary: String,
    category: String,
    source_url: String,
    timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub category: String,
    pub source_url: String,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = StoreError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Article {
            id: row.id,
            title: row.title,
            summary: row.summary,
            category: row.category,
            source_url: row.source_url,
            timestamp: DateTime::parse_from_rfc3339(&row.timestamp)?.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub summary: String,
    pub category: String,
    pub source_url: String,
    /// Defaults to the time of storage
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Like,
    Dislike,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Like => "like",
            FeedbackKind::Dislike => "dislike",
        }
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                category TEXT NOT NULL,
                source_url TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY,
                article_id INTEGER NOT NULL,
                feedback TEXT NOT NULL CHECK (feedback IN ('like', 'dislike')),
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_feedback_article
            ON feedback(article_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the new row id and the timestamp that was stored.
    pub async fn store_article(
        &self,
        article: &NewArticle,
    ) -> Result<(i64, DateTime<Utc>), StoreError> {
        let timestamp = article.timestamp.unwrap_or_else(Utc::now);

        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, summary, category, source_url, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.category)
        .bind(&article.source_url)
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok((result.last_insert_rowid(), timestamp))
    }

    /// All stored articles, newest first.
    pub async fn list_articles(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT * FROM articles ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Article::try_from).collect()
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>, StoreError> {
        let row = sqlx::query_as::<_, ArticleRow>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Article::try_from).transpose()
    }

    pub async fn add_feedback(
        &self,
        article_id: i64,
        kind: FeedbackKind,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO feedback (article_id, feedback, timestamp) VALUES (?, ?, ?)",
        )
        .bind(article_id)
        .bind(kind.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// `(likes, dislikes)` recorded for an article.
    pub async fn feedback_counts(&self, article_id: i64) -> Result<(i64, i64), StoreError> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN feedback = 'like' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN feedback = 'dislike' THEN 1 ELSE 0 END), 0)
            FROM feedback
            WHERE article_id = ?
            "#,
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn new_article(title: &str, timestamp: Option<DateTime<Utc>>) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            summary: format!("Summary of {}", title),
            category: "Technology".to_string(),
            source_url: format!("https://example.com/{}", title.to_lowercase()),
            timestamp,
        }
    }

    mod initialize_tests {
        use super::*;

        #[tokio::test]
        async fn test_initialize_is_idempotent() {
            let db = create_test_db().await;
            db.initialize().await.unwrap();
            assert!(db.list_articles().await.unwrap().is_empty());
        }
    }

    mod article_tests {
        use super::*;

        #[tokio::test]
        async fn test_store_and_get_article() {
            let db = create_test_db().await;
            let ts = Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap();

            let (id, stored_ts) = db.store_article(&new_article("Rust", Some(ts))).await.unwrap();
            assert_eq!(stored_ts, ts);

            let article = db.get_article(id).await.unwrap().unwrap();
            assert_eq!(article.title, "Rust");
            assert_eq!(article.category, "Technology");
            assert_eq!(article.timestamp, ts);
        }

        #[tokio::test]
        async fn test_timestamp_defaults_to_now() {
            let db = create_test_db().await;
            let before = Utc::now();

            let (_, stored_ts) = db.store_article(&new_article("Now", None)).await.unwrap();

            assert!(stored_ts >= before);
            assert!(stored_ts <= Utc::now());
        }

        #[tokio::test]
        async fn test_get_missing_article() {
            let db = create_test_db().await;
            assert!(db.get_article(999).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_list_newest_first() {
            let db = create_test_db().await;
            for i in 1..=3 {
                let ts = Utc.with_ymd_and_hms(2024, 12, i, 0, 0, 0).unwrap();
                db.store_article(&new_article(&format!("Day{}", i), Some(ts)))
                    .await
                    .unwrap();
            }

            let articles = db.list_articles().await.unwrap();
            let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
            assert_eq!(titles, vec!["Day3", "Day2", "Day1"]);
        }
    }

    mod feedback_tests {
        use super::*;

        #[tokio::test]
        async fn test_feedback_counts() {
            let db = create_test_db().await;
            let (id, _) = db.store_article(&new_article("Liked", None)).await.unwrap();

            db.add_feedback(id, FeedbackKind::Like).await.unwrap();
            db.add_feedback(id, FeedbackKind::Like).await.unwrap();
            db.add_feedback(id, FeedbackKind::Dislike).await.unwrap();

            assert_eq!(db.feedback_counts(id).await.unwrap(), (2, 1));
        }

        #[tokio::test]
        async fn test_feedback_counts_empty() {
            let db = create_test_db().await;
            assert_eq!(db.feedback_counts(42).await.unwrap(), (0, 0));
        }

        #[test]
        fn test_feedback_kind_serde() {
            let kind: FeedbackKind = serde_json::from_str(r#""dislike""#).unwrap();
            assert_eq!(kind, FeedbackKind::Dislike);
            assert!(serde_json::from_str::<FeedbackKind>(r#""meh""#).is_err());
            assert_eq!(FeedbackKind::Like.as_str(), "like");
        }
    }
}
