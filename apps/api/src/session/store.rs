//! Best-effort key/value persistence for session records.
//!
//! A record is a JSON object. `set` with `merge = true` overwrites only the
//! top-level keys it is given; `merge = false` replaces the record.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session record must be a JSON object")]
    NotAnObject,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, session_id: &str, fields: Value, merge: bool) -> Result<(), StoreError>;
}

fn into_object(fields: Value) -> Result<Map<String, Value>, StoreError> {
    match fields {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// In-process store used when no database is configured.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Value>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(session_id).cloned().map(Value::Object))
    }

    async fn set(&self, session_id: &str, fields: Value, merge: bool) -> Result<(), StoreError> {
        let fields = into_object(fields)?;
        let mut records = self.records.write().await;
        match records.get_mut(session_id) {
            Some(existing) if merge => existing.extend(fields),
            _ => {
                records.insert(session_id.to_string(), fields);
            }
        }
        Ok(())
    }
}

/// PostgreSQL-backed store. One JSONB document per session.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a small pool and makes sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL session store...");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Creates the backing table if it does not exist.
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_records (
                session_id  TEXT PRIMARY KEY,
                data        JSONB NOT NULL DEFAULT '{}'::jsonb,
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("session_records table ready");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Value>, StoreError> {
        Ok(
            sqlx::query_scalar::<_, Value>("SELECT data FROM session_records WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn set(&self, session_id: &str, fields: Value, merge: bool) -> Result<(), StoreError> {
        let fields = Value::Object(into_object(fields)?);

        // `||` on JSONB is a shallow merge, right side wins.
        let sql = if merge {
            r#"
            INSERT INTO session_records (session_id, data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (session_id)
            DO UPDATE SET data = session_records.data || EXCLUDED.data, updated_at = NOW()
            "#
        } else {
            r#"
            INSERT INTO session_records (session_id, data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (session_id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#
        };

        sqlx::query(sql)
            .bind(session_id)
            .bind(fields)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
