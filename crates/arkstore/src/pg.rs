use arkcore::catalog::ItemDef;
use arkcore::{Capture, UserId};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::backend::{Backend, UserRow};
use crate::StoreError;

// BIGSERIAL/BIGINT throughout so ids and counts decode as i64, same as the
// embedded backend's integer affinity.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        external_id BIGINT UNIQUE,
        handle TEXT UNIQUE,
        first_name TEXT,
        last_name TEXT
    )",
    "CREATE TABLE IF NOT EXISTS captures (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        item_name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        rarity TEXT NOT NULL,
        count BIGINT NOT NULL DEFAULT 0,
        UNIQUE(user_id, item_name)
    )",
];

/// Networked relational backend, selected whenever a database URL is
/// configured. TLS and auth live in the URL (sslmode and friends).
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(backend = "postgres", "opened capture store");
        Ok(Self { pool })
    }
}

fn user_row(row: &PgRow) -> Result<UserRow, StoreError> {
    Ok(UserRow {
        id: UserId(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        handle: row.try_get("handle")?,
    })
}

fn capture_row(row: &PgRow) -> Result<Capture, StoreError> {
    Ok(Capture {
        item_name: row.try_get("item_name")?,
        symbol: row.try_get("symbol")?,
        rarity: row.try_get("rarity")?,
        count: row.try_get("count")?,
    })
}

#[async_trait]
impl Backend for PgBackend {
    async fn init_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn user_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<UserRow>, StoreError> {
        let row = sqlx::query("SELECT id, external_id, handle FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_row).transpose()
    }

    async fn user_by_handle(&self, handle: &str) -> Result<Option<UserRow>, StoreError> {
        let row = sqlx::query("SELECT id, external_id, handle FROM users WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_row).transpose()
    }

    async fn insert_user(
        &self,
        external_id: Option<i64>,
        handle: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<UserId, StoreError> {
        let row = sqlx::query(
            "INSERT INTO users (external_id, handle, first_name, last_name)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(external_id)
        .bind(handle)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserId(row.try_get("id")?))
    }

    async fn set_external_id_if_missing(
        &self,
        user: UserId,
        external_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET external_id = $1 WHERE id = $2 AND external_id IS NULL")
            .bind(external_id)
            .bind(user.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_capture(&self, user: UserId, item: &ItemDef) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO captures (user_id, item_name, symbol, rarity, count)
             VALUES ($1, $2, $3, $4, 1)
             ON CONFLICT (user_id, item_name) DO UPDATE SET count = captures.count + 1
             RETURNING count",
        )
        .bind(user.0)
        .bind(item.name)
        .bind(item.symbol)
        .bind(item.rarity.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("count")?)
    }

    async fn capture_count(
        &self,
        user: UserId,
        item_name: &str,
    ) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT count FROM captures WHERE user_id = $1 AND item_name = $2")
            .bind(user.0)
            .bind(item_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(r) => Some(r.try_get("count")?),
            None => None,
        })
    }

    async fn captures_for_user(&self, user: UserId) -> Result<Vec<Capture>, StoreError> {
        let rows = sqlx::query(
            "SELECT item_name, symbol, rarity, count FROM captures WHERE user_id = $1",
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(capture_row).collect()
    }
}
