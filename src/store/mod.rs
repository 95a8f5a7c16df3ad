//! Fail-soft key/value persistence.
//!
//! This module provides the storage foundation for the feed cache:
//! - A `StorageMedium` port over a synchronous, size-limited backend
//! - SQLite and in-memory mediums, both enforcing a byte quota
//! - `PersistentStore`, a JSON layer that never surfaces storage failures
//!
//! Keys are namespaced by their callers; several subsystems may share one
//! medium, so nothing here ever clears more than the keys it is given.

mod medium;
mod persistent;
mod sqlite;

pub use medium::{MemoryMedium, StorageError, StorageMedium};
pub use persistent::PersistentStore;
pub use sqlite::SqliteMedium;
