//! arkcore
//!
//! Pure core of the ark capture game: the weighted item catalog, the random
//! draw over it, and the deterministic inventory ordering. Nothing in this
//! crate touches IO; identity resolution and the capture ledger live in
//! `arkstore` and hand rows back to `rank`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod draw;
pub mod rank;

/// Stable internal id of a user record. Assigned by storage on first contact
/// and never reassigned to another principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ledger row: how many times a user has captured a given item.
///
/// `symbol` and `rarity` are copies taken from the catalog at capture time,
/// so an old collection still renders the same after a catalog change. The
/// rarity stays a plain string for the same reason: rows written under a
/// since-retired tier must survive a round trip (they sort last, see
/// [`catalog::rarity_rank`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub item_name: String,
    pub symbol: String,
    pub rarity: String,
    pub count: i64,
}
