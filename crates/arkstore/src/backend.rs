use arkcore::catalog::ItemDef;
use arkcore::{Capture, UserId};
use async_trait::async_trait;

use crate::StoreError;

/// Identity columns of one user row; enough for the resolver to decide
/// whether a backfill applies.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: UserId,
    pub external_id: Option<i64>,
    pub handle: Option<String>,
}

/// Capability set the resolver and ledger need from a storage engine: point
/// lookups, inserts, the null-guarded backfill, the conflict upsert, and
/// transactional schema creation. One implementation per engine; `Store`
/// owns whichever the configuration selected.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create tables and unique indexes if missing, inside one transaction.
    async fn init_schema(&self) -> Result<(), StoreError>;

    async fn user_by_external_id(&self, external_id: i64)
        -> Result<Option<UserRow>, StoreError>;

    async fn user_by_handle(&self, handle: &str) -> Result<Option<UserRow>, StoreError>;

    async fn insert_user(
        &self,
        external_id: Option<i64>,
        handle: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<UserId, StoreError>;

    /// Record an external id on a row that has none. Guarded by
    /// `external_id IS NULL`: a concurrent writer that got there first turns
    /// this into a no-op instead of an overwrite.
    async fn set_external_id_if_missing(
        &self,
        user: UserId,
        external_id: i64,
    ) -> Result<(), StoreError>;

    /// The one atomic ledger statement: insert the pair at count 1, or bump
    /// the existing row, and return the resulting count.
    async fn upsert_capture(&self, user: UserId, item: &ItemDef) -> Result<i64, StoreError>;

    async fn capture_count(
        &self,
        user: UserId,
        item_name: &str,
    ) -> Result<Option<i64>, StoreError>;

    /// All ledger rows for the user, unordered. Empty when the user has no
    /// captures or does not exist.
    async fn captures_for_user(&self, user: UserId) -> Result<Vec<Capture>, StoreError>;
}
