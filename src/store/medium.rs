//! Storage medium trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

/// Failures raised by a storage medium.
///
/// None of these reach callers of `PersistentStore`; they are logged and
/// turned into cache misses or dropped writes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  /// The medium refused a write because it would exceed its byte quota
  #[error("quota exceeded writing {key}: {needed} bytes needed, quota is {quota}")]
  QuotaExceeded {
    key: String,
    needed: usize,
    quota: usize,
  },
  /// A stored value could not be decoded
  #[error("stored value under {key} is corrupt: {reason}")]
  Corrupt { key: String, reason: String },
  /// Any other backend failure (I/O, SQL, poisoned lock)
  #[error("storage backend error: {0}")]
  Backend(String),
}

/// A synchronous, size-bounded key/value medium.
///
/// Implementations must reject a write that would push the total stored size
/// over their quota, leaving the previous value for that key in place.
pub trait StorageMedium: Send + Sync {
  /// Read the raw value stored under `key`.
  fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Store `value` under `key`, replacing any previous value.
  fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

  /// Delete `key`. Deleting a missing key succeeds.
  fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Size of one entry as charged against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
  key.len() + value.len()
}

/// Check that adding an entry to `used` bytes stays within `quota`.
pub(crate) fn check_quota(
  key: &str,
  value: &str,
  used: usize,
  quota: usize,
) -> Result<(), StorageError> {
  let needed = used.saturating_add(entry_size(key, value));
  if needed > quota {
    return Err(StorageError::QuotaExceeded {
      key: key.to_string(),
      needed,
      quota,
    });
  }
  Ok(())
}

/// In-process medium. Used for `--ephemeral` runs and as the test fake.
pub struct MemoryMedium {
  entries: Mutex<HashMap<String, String>>,
  quota: usize,
}

impl MemoryMedium {
  /// Create an empty medium holding at most `quota` bytes.
  pub fn new(quota: usize) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      quota,
    }
  }

  /// Create a medium with no practical size limit.
  #[cfg(test)]
  pub fn unbounded() -> Self {
    Self::new(usize::MAX)
  }
}

impl StorageMedium for MemoryMedium {
  fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))?;
    Ok(entries.get(key).cloned())
  }

  fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))?;

    // The entry being replaced does not count against the new write
    let used: usize = entries
      .iter()
      .filter(|(k, _)| k.as_str() != key)
      .map(|(k, v)| entry_size(k, v))
      .sum();
    check_quota(key, value, used, self.quota)?;

    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), StorageError> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))?;
    entries.remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_write_then_read() {
    let medium = MemoryMedium::unbounded();
    medium.write("a", "1").unwrap();
    assert_eq!(medium.read("a").unwrap().as_deref(), Some("1"));
    assert_eq!(medium.read("b").unwrap(), None);
  }

  #[test]
  fn test_quota_rejection_keeps_previous_value() {
    let medium = MemoryMedium::new(10);
    medium.write("k", "small").unwrap();

    let err = medium.write("k", "far too large").unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));
    assert_eq!(medium.read("k").unwrap().as_deref(), Some("small"));
  }

  #[test]
  fn test_replacing_a_key_only_charges_the_new_value() {
    // "k" + 9 bytes = 10, exactly at quota
    let medium = MemoryMedium::new(10);
    medium.write("k", "123456789").unwrap();
    medium.write("k", "987654321").unwrap();
    assert_eq!(medium.read("k").unwrap().as_deref(), Some("987654321"));
  }

  #[test]
  fn test_quota_counts_other_keys() {
    let medium = MemoryMedium::new(8);
    medium.write("a", "123").unwrap();
    assert!(medium.write("b", "1234").is_err());
    assert!(medium.write("b", "12").is_ok());
  }

  #[test]
  fn test_delete_is_idempotent() {
    let medium = MemoryMedium::unbounded();
    medium.write("a", "1").unwrap();
    medium.delete("a").unwrap();
    medium.delete("a").unwrap();
    assert_eq!(medium.read("a").unwrap(), None);
  }
}
