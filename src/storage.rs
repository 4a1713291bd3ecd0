use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::models::{ListingKey, SourceKind, WaitingRequest};
use crate::utils::error::Result;

/// SQLite-backed repository for the waiting-request queue, the subscriber
/// list, and the per-source seen-key sets.
///
/// The queue is owned by the enrollment flow; the watcher core only reads
/// the ordered view and removes an entry after a successful reservation.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// An isolated in-memory store, mainly for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS waiting_queue (
                requester_id     INTEGER NOT NULL,
                residence_filter TEXT NOT NULL,
                contact_email    TEXT NOT NULL,
                enqueued_at      TEXT NOT NULL,
                priority         INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS subscribers (user_id INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_keys (
                source TEXT NOT NULL,
                key    TEXT NOT NULL,
                PRIMARY KEY (source, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- waiting-request queue ---

    pub async fn enqueue(
        &self,
        requester_id: i64,
        residence_filter: &str,
        contact_email: &str,
        priority: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO waiting_queue (requester_id, residence_filter, contact_email, enqueued_at, priority) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(requester_id)
        .bind(residence_filter)
        .bind(contact_email)
        .bind(Utc::now())
        .bind(priority)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove every entry for a requester. Returns whether anything was
    /// actually removed.
    pub async fn remove(&self, requester_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM waiting_queue WHERE requester_id = ?")
            .bind(requester_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The queue's exposed order: priority descending, then enqueue time
    /// ascending so earlier requests win ties.
    pub async fn list_ordered(&self) -> Result<Vec<WaitingRequest>> {
        let rows = sqlx::query_as::<_, WaitingRequest>(
            "SELECT requester_id, residence_filter, contact_email, enqueued_at, priority \
             FROM waiting_queue ORDER BY priority DESC, enqueued_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn contains(&self, requester_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM waiting_queue WHERE requester_id = ? LIMIT 1")
                .bind(requester_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    // --- notification subscribers ---

    pub async fn add_subscriber(&self, user_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO subscribers (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove_subscriber(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn subscriber_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // --- persisted seen-sets ---

    pub async fn load_seen(&self, source: SourceKind) -> Result<HashSet<ListingKey>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT key FROM seen_keys WHERE source = ?")
            .bind(source.to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(raw,)| match source {
                SourceKind::Crous => raw
                    .parse::<i64>()
                    .map(ListingKey::Numeric)
                    .unwrap_or(ListingKey::Composite(raw)),
                SourceKind::Studefi => ListingKey::Composite(raw),
            })
            .collect())
    }

    /// Atomically replace the persisted seen-set for one source with the
    /// keys of the latest successful poll.
    pub async fn replace_seen(&self, source: SourceKind, keys: &HashSet<ListingKey>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM seen_keys WHERE source = ?")
            .bind(source.to_string())
            .execute(&mut *tx)
            .await?;

        for key in keys {
            sqlx::query("INSERT OR IGNORE INTO seen_keys (source, key) VALUES (?, ?)")
                .bind(source.to_string())
                .bind(key.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
