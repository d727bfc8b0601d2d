//! Where delivered titles are remembered between rounds.
//!
//! The pipeline never writes here itself; callers record a result set only
//! after a successful run and read the history back as the exclusion set.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::HistoryError;

/// Trait for storing and retrieving delivered recommendation titles
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Every title recorded for `owner_id`, oldest first.
    async fn delivered_titles(&self, owner_id: &str) -> Result<Vec<String>, HistoryError>;

    async fn record(&self, owner_id: &str, titles: &[String]) -> Result<(), HistoryError>;
}

/// In-memory implementation of HistoryStore
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: Arc<DashMap<String, Vec<String>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn delivered_titles(&self, owner_id: &str) -> Result<Vec<String>, HistoryError> {
        Ok(self
            .entries
            .get(owner_id)
            .map(|titles| titles.clone())
            .unwrap_or_default())
    }

    async fn record(&self, owner_id: &str, titles: &[String]) -> Result<(), HistoryError> {
        if titles.is_empty() {
            return Ok(());
        }
        self.entries
            .entry(owner_id.to_string())
            .or_default()
            .extend(titles.iter().cloned());
        debug!(owner_id = %owner_id, count = titles.len(), "Recorded delivered titles");
        Ok(())
    }
}

/// PostgreSQL implementation of HistoryStore. One row per delivered batch.
pub struct PostgresHistoryStore {
    pool: sqlx::PgPool,
}

impl PostgresHistoryStore {
    pub async fn connect(database_url: &str) -> Result<Self, HistoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS recommendation_history (
                 id BIGSERIAL PRIMARY KEY,
                 owner_id TEXT NOT NULL,
                 titles JSONB NOT NULL,
                 sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS recommendation_history_owner_idx \
             ON recommendation_history (owner_id)",
        )
        .execute(&pool)
        .await?;

        info!("Connected to PostgreSQL history store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn delivered_titles(&self, owner_id: &str) -> Result<Vec<String>, HistoryError> {
        let rows = sqlx::query_as::<_, (Json<Vec<String>>,)>(
            "SELECT titles FROM recommendation_history \
             WHERE owner_id = $1 ORDER BY sent_at, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .flat_map(|(Json(titles),)| titles)
            .collect())
    }

    async fn record(&self, owner_id: &str, titles: &[String]) -> Result<(), HistoryError> {
        if titles.is_empty() {
            return Ok(());
        }
        sqlx::query("INSERT INTO recommendation_history (owner_id, titles) VALUES ($1, $2)")
            .bind(owner_id)
            .bind(Json(titles))
            .execute(&self.pool)
            .await?;
        debug!(owner_id = %owner_id, count = titles.len(), "Recorded delivered titles");
        Ok(())
    }
}
