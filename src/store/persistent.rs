//! JSON layer over a storage medium that never fails to its callers.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::medium::{StorageError, StorageMedium};

/// Fail-soft key/value store.
///
/// - `get` treats unreadable or corrupt content as a miss
/// - `set` swallows rejected writes (quota exceeded); the caller's in-memory
///   state stays authoritative, the next session simply won't see the data
/// - `remove` is idempotent
#[derive(Clone)]
pub struct PersistentStore {
  medium: Arc<dyn StorageMedium>,
}

impl PersistentStore {
  pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
    Self { medium }
  }

  /// Read and decode the value under `key`.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.medium.read(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(key, error = %e, "Failed to read from store");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        let err = StorageError::Corrupt {
          key: key.to_string(),
          reason: e.to_string(),
        };
        warn!(error = %err, "Treating corrupt entry as a cache miss");
        None
      }
    }
  }

  /// Encode and store `value` under `key`.
  pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key, error = %e, "Failed to serialize value for store");
        return;
      }
    };

    if let Err(e) = self.medium.write(key, &raw) {
      warn!(key, error = %e, "Dropped write to store");
    }
  }

  /// Delete `key` if present.
  pub fn remove(&self, key: &str) {
    if let Err(e) = self.medium.delete(key) {
      warn!(key, error = %e, "Failed to remove key from store");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryMedium;

  fn store_with(medium: MemoryMedium) -> (PersistentStore, Arc<MemoryMedium>) {
    let medium = Arc::new(medium);
    (PersistentStore::new(medium.clone()), medium)
  }

  #[test]
  fn test_round_trip() {
    let (store, _) = store_with(MemoryMedium::unbounded());
    store.set("numbers", &vec![1, 2, 3]);
    assert_eq!(store.get::<Vec<i32>>("numbers"), Some(vec![1, 2, 3]));
  }

  #[test]
  fn test_missing_key_is_none() {
    let (store, _) = store_with(MemoryMedium::unbounded());
    assert_eq!(store.get::<Vec<i32>>("nothing"), None);
  }

  #[test]
  fn test_corrupt_json_is_a_miss() {
    let (store, medium) = store_with(MemoryMedium::unbounded());
    medium.write("feed", "{not json").unwrap();
    assert_eq!(store.get::<serde_json::Value>("feed"), None);
  }

  #[test]
  fn test_wrong_shape_is_a_miss() {
    let (store, medium) = store_with(MemoryMedium::unbounded());
    medium.write("feed", r#"{"a":1}"#).unwrap();
    assert_eq!(store.get::<Vec<i32>>("feed"), None);
  }

  #[test]
  fn test_quota_failure_is_swallowed() {
    let (store, _) = store_with(MemoryMedium::new(16));
    store.set("k", &"short");
    store.set("k", &"this value will not fit in sixteen bytes");
    assert_eq!(store.get::<String>("k").as_deref(), Some("short"));
  }

  #[test]
  fn test_remove_is_idempotent() {
    let (store, _) = store_with(MemoryMedium::unbounded());
    store.set("k", &1);
    store.remove("k");
    store.remove("k");
    assert_eq!(store.get::<i32>("k"), None);
  }
}
