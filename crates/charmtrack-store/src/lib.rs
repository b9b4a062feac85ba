//! In-process state for the charm catalog and the watchlist.
//!
//! Persistence is deliberately out of scope; both stores live in memory
//! and are rebuilt from the seed catalog at startup.

pub mod charms;
pub mod error;
pub mod watchlist;

pub use charms::{CharmFilter, CharmSort, CharmStore};
pub use error::StoreError;
pub use watchlist::{KeyValueStore, MemoryKeyValueStore, Watchlist};
