use std::path::Path;
use std::time::Duration;

use arkcore::catalog::ItemDef;
use arkcore::{Capture, UserId};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use tracing::info;

use crate::backend::{Backend, UserRow};
use crate::StoreError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        external_id INTEGER UNIQUE,
        handle TEXT UNIQUE,
        first_name TEXT,
        last_name TEXT
    )",
    "CREATE TABLE IF NOT EXISTS captures (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        item_name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        rarity TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        UNIQUE(user_id, item_name),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    )",
];

/// Embedded single-file backend. WAL with NORMAL sync, foreign keys on, and
/// a busy timeout so pooled writers queue instead of failing under load.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(sqlx::Error::from)?;
        }
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        info!(backend = "sqlite", path = %path.display(), "opened capture store");
        Ok(Self { pool })
    }
}

fn user_row(row: &SqliteRow) -> Result<UserRow, StoreError> {
    Ok(UserRow {
        id: UserId(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        handle: row.try_get("handle")?,
    })
}

fn capture_row(row: &SqliteRow) -> Result<Capture, StoreError> {
    Ok(Capture {
        item_name: row.try_get("item_name")?,
        symbol: row.try_get("symbol")?,
        rarity: row.try_get("rarity")?,
        count: row.try_get("count")?,
    })
}

#[async_trait]
impl Backend for SqliteBackend {
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
        let row = sqlx::query("SELECT id, external_id, handle FROM users WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_row).transpose()
    }

    async fn user_by_handle(&self, handle: &str) -> Result<Option<UserRow>, StoreError> {
        let row = sqlx::query("SELECT id, external_id, handle FROM users WHERE handle = ?")
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
        let res = sqlx::query(
            "INSERT INTO users (external_id, handle, first_name, last_name) VALUES (?, ?, ?, ?)",
        )
        .bind(external_id)
        .bind(handle)
        .bind(first_name)
        .bind(last_name)
        .execute(&self.pool)
        .await?;
        Ok(UserId(res.last_insert_rowid()))
    }

    async fn set_external_id_if_missing(
        &self,
        user: UserId,
        external_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET external_id = ? WHERE id = ? AND external_id IS NULL")
            .bind(external_id)
            .bind(user.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_capture(&self, user: UserId, item: &ItemDef) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO captures (user_id, item_name, symbol, rarity, count)
             VALUES (?, ?, ?, ?, 1)
             ON CONFLICT(user_id, item_name) DO UPDATE SET count = count + 1
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
        let row = sqlx::query("SELECT count FROM captures WHERE user_id = ? AND item_name = ?")
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
        let rows =
            sqlx::query("SELECT item_name, symbol, rarity, count FROM captures WHERE user_id = ?")
                .bind(user.0)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(capture_row).collect()
    }
}
