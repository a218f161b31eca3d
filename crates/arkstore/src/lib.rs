//! arkstore
//!
//! Persistent side of the ark capture game: resolution of external chat
//! identities onto stable user records, and the per-(user, item) capture
//! ledger. Runs over either an embedded SQLite file or a Postgres pool
//! behind one [`backend::Backend`] trait, selected by configuration.
//!
//! Every increment goes through a single conditional upsert, so concurrent
//! captures of the same pair serialize inside the database; the resolver
//! only has to absorb first-contact uniqueness races, which it does by
//! retrying its lookup once.

use std::sync::Arc;

use arkcore::catalog::{find_item, ItemDef};
use arkcore::rank::rank;
use arkcore::{Capture, UserId};
use thiserror::Error;
use tracing::warn;

pub mod backend;
pub mod config;
pub mod pg;
pub mod sqlite;

use backend::Backend;
use config::StoreConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No user record matches the supplied identity. A valid empty-result
    /// signal on the read path, not a fault.
    #[error("no user record for the supplied identity")]
    NotFound,
    /// A uniqueness constraint rejected the write; a concurrent writer won
    /// the race. The resolver recovers from this by re-running its lookup.
    #[error("uniqueness constraint rejected the write")]
    ConstraintViolation,
    /// The item is not in the catalog, or disagrees with its catalog
    /// definition. Caller programming error.
    #[error("item not in catalog: {0}")]
    InvalidItem(String),
    /// The backend could not be reached or a statement failed outright.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::ConstraintViolation
            }
            _ => StoreError::StorageUnavailable(e),
        }
    }
}

/// Handle to the capture store. Cheap to clone; clones share one pool.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    /// Connect the backend the configuration selects and run schema init
    /// before handing the store out. Init failures surface here; nothing is
    /// deferred to first use.
    pub async fn open(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let backend: Arc<dyn Backend> = match cfg.database_url.as_deref() {
            Some(url) => Arc::new(pg::PgBackend::connect(url, cfg.max_connections).await?),
            None => {
                Arc::new(sqlite::SqliteBackend::connect(&cfg.sqlite_path(), cfg.max_connections).await?)
            }
        };
        backend.init_schema().await?;
        Ok(Self { backend })
    }

    /// Map an external identity to its durable user record, creating one if
    /// nothing matches. The numeric external id is authoritative; the handle
    /// is only consulted when the external id matched nothing, because
    /// handles get reassigned and the id does not.
    pub async fn resolve_or_create(
        &self,
        external_id: Option<i64>,
        handle: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<UserId, StoreError> {
        if let Some(id) = self.lookup(external_id, handle, true).await? {
            return Ok(id);
        }
        match self
            .backend
            .insert_user(external_id, handle, first_name, last_name)
            .await
        {
            Ok(id) => Ok(id),
            Err(StoreError::ConstraintViolation) => {
                // A concurrent first capture inserted the same identity
                // between our lookup and insert; their row wins.
                warn!(
                    external_id = ?external_id,
                    handle = ?handle,
                    "user insert lost a uniqueness race; retrying lookup"
                );
                match self.lookup(external_id, handle, true).await? {
                    Some(id) => Ok(id),
                    None => Err(StoreError::ConstraintViolation),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Same two lookups as [`Store::resolve_or_create`], never creating or
    /// mutating. [`StoreError::NotFound`] when neither matches.
    pub async fn resolve_read_only(
        &self,
        external_id: Option<i64>,
        handle: Option<&str>,
    ) -> Result<UserId, StoreError> {
        match self.lookup(external_id, handle, false).await? {
            Some(id) => Ok(id),
            None => Err(StoreError::NotFound),
        }
    }

    async fn lookup(
        &self,
        external_id: Option<i64>,
        handle: Option<&str>,
        backfill: bool,
    ) -> Result<Option<UserId>, StoreError> {
        if let Some(ext) = external_id {
            if let Some(u) = self.backend.user_by_external_id(ext).await? {
                return Ok(Some(u.id));
            }
        }
        let Some(h) = handle else {
            return Ok(None);
        };
        let Some(u) = self.backend.user_by_handle(h).await? else {
            return Ok(None);
        };
        if backfill && u.external_id.is_none() {
            if let Some(ext) = external_id {
                match self.backend.set_external_id_if_missing(u.id, ext).await {
                    Ok(()) => {}
                    Err(StoreError::ConstraintViolation) => {
                        // The external id landed on another row concurrently;
                        // the row that owns it is authoritative.
                        warn!(
                            external_id = ext,
                            "backfill lost a uniqueness race; following the external id"
                        );
                        if let Some(w) = self.backend.user_by_external_id(ext).await? {
                            return Ok(Some(w.id));
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(Some(u.id))
    }

    /// Record one capture and return the new count. The item must be a
    /// catalog entry; the canonical definition is what gets denormalized
    /// into the row, so a caller-held copy cannot smuggle in stale fields.
    pub async fn record_capture(&self, user: UserId, item: &ItemDef) -> Result<i64, StoreError> {
        let def = match find_item(item.name) {
            Some(def) if def.symbol == item.symbol && def.rarity == item.rarity => def,
            _ => return Err(StoreError::InvalidItem(item.name.to_string())),
        };
        self.backend.upsert_capture(user, def).await
    }

    /// All ledger rows for the user, unordered; ordering is [`rank`]'s job.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Capture>, StoreError> {
        self.backend.captures_for_user(user).await
    }

    pub async fn capture_count(
        &self,
        user: UserId,
        item_name: &str,
    ) -> Result<Option<i64>, StoreError> {
        self.backend.capture_count(user, item_name).await
    }

    /// The whole read path in one call: read-only resolve, list, rank. An
    /// identity with no record yields an empty collection, not an error.
    pub async fn inventory(
        &self,
        external_id: Option<i64>,
        handle: Option<&str>,
    ) -> Result<Vec<Capture>, StoreError> {
        let user = match self.resolve_read_only(external_id, handle).await {
            Ok(id) => id,
            Err(StoreError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(rank(self.backend.captures_for_user(user).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkcore::catalog::Rarity;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().expect("tempdir");
        let cfg = StoreConfig {
            database_url: None,
            data_dir: dir.path().to_path_buf(),
            max_connections: 5,
        };
        let store = Store::open(&cfg).await.expect("open store");
        (dir, store)
    }

    fn item(name: &str) -> &'static ItemDef {
        find_item(name).expect("catalog item")
    }

    #[tokio::test]
    async fn first_capture_counts_one_then_two() {
        let (_dir, store) = open_store().await;
        let u = store
            .resolve_or_create(Some(1), Some("alice"), Some("Alice"), None)
            .await
            .unwrap();
        assert_eq!(store.record_capture(u, item("Fox")).await.unwrap(), 1);
        assert_eq!(store.record_capture(u, item("Fox")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn counts_are_independent_per_item() {
        let (_dir, store) = open_store().await;
        let u = store
            .resolve_or_create(Some(2), None, None, None)
            .await
            .unwrap();
        assert_eq!(store.record_capture(u, item("Fox")).await.unwrap(), 1);
        assert_eq!(store.record_capture(u, item("Cat")).await.unwrap(), 1);
        assert_eq!(store.record_capture(u, item("Fox")).await.unwrap(), 2);
        assert_eq!(store.capture_count(u, "Fox").await.unwrap(), Some(2));
        assert_eq!(store.capture_count(u, "Cat").await.unwrap(), Some(1));
        assert_eq!(store.list_for_user(u).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let (_dir, store) = open_store().await;
        let a = store
            .resolve_or_create(Some(42), Some("alice"), Some("Alice"), Some("A"))
            .await
            .unwrap();
        let b = store
            .resolve_or_create(Some(42), Some("alice"), Some("Alice"), Some("A"))
            .await
            .unwrap();
        assert_eq!(a, b);
        // Handle-only resolution reaches the same record.
        let c = store
            .resolve_or_create(None, Some("alice"), None, None)
            .await
            .unwrap();
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn external_id_wins_over_a_reassigned_handle() {
        let (_dir, store) = open_store().await;
        let a = store
            .resolve_or_create(Some(42), Some("alice"), None, None)
            .await
            .unwrap();
        let b = store
            .resolve_or_create(Some(42), Some("bob"), None, None)
            .await
            .unwrap();
        assert_eq!(a, b);
        // The stored handle is untouched and "bob" matches nothing.
        let row = store
            .backend
            .user_by_handle("alice")
            .await
            .unwrap()
            .expect("alice row");
        assert_eq!(row.id, a);
        assert!(store.backend.user_by_handle("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn handle_match_backfills_missing_external_id_once() {
        let (_dir, store) = open_store().await;
        let carol = store
            .resolve_or_create(None, Some("carol"), Some("Carol"), None)
            .await
            .unwrap();
        let again = store
            .resolve_or_create(Some(99), Some("carol"), None, None)
            .await
            .unwrap();
        assert_eq!(carol, again);
        let row = store
            .backend
            .user_by_external_id(99)
            .await
            .unwrap()
            .expect("backfilled row");
        assert_eq!(row.id, carol);
        // The external id is authoritative from here on, handle or no.
        let renamed = store
            .resolve_or_create(Some(99), Some("someoneElse"), None, None)
            .await
            .unwrap();
        assert_eq!(renamed, carol);
    }

    #[tokio::test]
    async fn backfill_never_overwrites_a_recorded_external_id() {
        let (_dir, store) = open_store().await;
        let a = store
            .resolve_or_create(Some(7), Some("dave"), None, None)
            .await
            .unwrap();
        let b = store
            .resolve_or_create(Some(8), Some("dave"), None, None)
            .await
            .unwrap();
        assert_eq!(a, b);
        let row = store
            .backend
            .user_by_handle("dave")
            .await
            .unwrap()
            .expect("dave row");
        assert_eq!(row.external_id, Some(7));
    }

    #[tokio::test]
    async fn read_only_resolution_neither_creates_nor_mutates() {
        let (_dir, store) = open_store().await;
        match store.resolve_read_only(Some(5), Some("eve")).await {
            Err(StoreError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(store.backend.user_by_handle("eve").await.unwrap().is_none());

        let id = store
            .resolve_or_create(None, Some("frank"), None, None)
            .await
            .unwrap();
        let found = store.resolve_read_only(Some(123), Some("frank")).await.unwrap();
        assert_eq!(found, id);
        // No backfill on the read path.
        let row = store
            .backend
            .user_by_handle("frank")
            .await
            .unwrap()
            .expect("frank row");
        assert_eq!(row.external_id, None);
    }

    #[tokio::test]
    async fn anonymous_identities_each_get_a_fresh_row() {
        let (_dir, store) = open_store().await;
        let a = store
            .resolve_or_create(None, None, Some("Mallory"), None)
            .await
            .unwrap();
        let b = store
            .resolve_or_create(None, None, Some("Mallory"), None)
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn list_is_empty_without_captures() {
        let (_dir, store) = open_store().await;
        let u = store
            .resolve_or_create(Some(3), None, None, None)
            .await
            .unwrap();
        assert!(store.list_for_user(u).await.unwrap().is_empty());
        assert_eq!(store.capture_count(u, "Fox").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_identity_inventory_is_empty() {
        let (_dir, store) = open_store().await;
        assert!(store
            .inventory(Some(404), Some("ghost"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn fabricated_items_are_rejected() {
        let (_dir, store) = open_store().await;
        let u = store
            .resolve_or_create(Some(11), None, None, None)
            .await
            .unwrap();
        let bogus = ItemDef {
            name: "Chupacabra",
            symbol: "?",
            rarity: Rarity::Common,
            weight: 1,
        };
        match store.record_capture(u, &bogus).await {
            Err(StoreError::InvalidItem(name)) => assert_eq!(name, "Chupacabra"),
            other => panic!("expected InvalidItem, got {other:?}"),
        }
        // A real name with forged fields is just as invalid.
        let forged = ItemDef {
            name: "Fox",
            symbol: "🐺",
            rarity: Rarity::Legendary,
            weight: 1,
        };
        assert!(matches!(
            store.record_capture(u, &forged).await,
            Err(StoreError::InvalidItem(_))
        ));
        assert!(store.list_for_user(u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_captures_count_every_event() {
        let (_dir, store) = open_store().await;
        let u = store
            .resolve_or_create(Some(50), Some("grace"), None, None)
            .await
            .unwrap();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record_capture(u, item("Fox")).await
            }));
        }
        for h in handles {
            h.await.expect("join").expect("capture");
        }
        assert_eq!(store.capture_count(u, "Fox").await.unwrap(), Some(50));
        let rows = store.list_for_user(u).await.unwrap();
        assert_eq!(rows.len(), 1, "one row per (user, item)");
        assert_eq!(rows[0].count, 50);
    }

    #[tokio::test]
    async fn concurrent_first_resolves_converge_on_one_row() {
        let (_dir, store) = open_store().await;
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .resolve_or_create(Some(777), Some("heidi"), None, None)
                    .await
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.expect("join").expect("resolve"));
        }
        let first = ids[0];
        assert!(ids.iter().all(|id| *id == first), "ids diverged: {ids:?}");
    }

    #[tokio::test]
    async fn inventory_is_ranked() {
        let (_dir, store) = open_store().await;
        let u = store
            .resolve_or_create(Some(9000), Some("ivan"), None, None)
            .await
            .unwrap();
        for _ in 0..9 {
            store.record_capture(u, item("Mouse")).await.unwrap();
            store.record_capture(u, item("Cat")).await.unwrap();
        }
        for _ in 0..3 {
            store.record_capture(u, item("Zebra")).await.unwrap();
        }
        store.record_capture(u, item("Dragon")).await.unwrap();

        let inv = store.inventory(Some(9000), None).await.unwrap();
        let names: Vec<_> = inv.iter().map(|c| c.item_name.as_str()).collect();
        assert_eq!(names, ["Dragon", "Zebra", "Cat", "Mouse"]);
        let counts: Vec<_> = inv.iter().map(|c| c.count).collect();
        assert_eq!(counts, [1, 3, 9, 9]);
        assert_eq!(inv[0].symbol, "🐉");
        assert_eq!(inv[0].rarity, "legendary");
    }

    #[tokio::test]
    async fn open_surfaces_init_failures() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").expect("write blocker");
        // data_dir is a regular file, so the store cannot set up under it.
        let cfg = StoreConfig {
            database_url: None,
            data_dir: blocker,
            max_connections: 1,
        };
        match Store::open(&cfg).await {
            Err(StoreError::StorageUnavailable(_)) => {}
            other => {
                let outcome = other.map(|_| "a store handle");
                panic!("expected StorageUnavailable, got {outcome:?}");
            }
        }
    }

    // Round trip against a live server; set ARKSTORE_TEST_PG_URL to enable.
    #[tokio::test]
    async fn postgres_round_trip_when_configured() {
        let Ok(url) = std::env::var("ARKSTORE_TEST_PG_URL") else {
            return;
        };
        let cfg = StoreConfig {
            database_url: Some(url),
            ..StoreConfig::default()
        };
        let store = Store::open(&cfg).await.expect("open pg store");
        let ext = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos() as i64;
        let u = store
            .resolve_or_create(Some(ext), None, Some("PG"), None)
            .await
            .unwrap();
        assert_eq!(store.record_capture(u, item("Owl")).await.unwrap(), 1);
        assert_eq!(store.record_capture(u, item("Owl")).await.unwrap(), 2);
        let inv = store.inventory(Some(ext), None).await.unwrap();
        assert_eq!(inv.len(), 1);
        assert_eq!(inv[0].count, 2);
    }
}
