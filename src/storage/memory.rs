//! In-memory bucket store.

use crate::error::Result;
use crate::storage::BucketStore;
use std::collections::BTreeMap;

/// `BTreeMap`-backed store; iteration is in key order like a range-capable
/// on-disk store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucketStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryBucketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BucketStore for MemoryBucketStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], payload: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), payload.to_vec());
        Ok(())
    }

    fn iterate_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{append_to_bucket, read_bucket, stored_codes};

    #[test]
    fn test_get_put() {
        let mut store = MemoryBucketStore::new();
        assert!(store.get(b"k").unwrap().is_none());
        store.put(b"k", b"v1").unwrap();
        store.put(b"k", b"v2").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_bucket_helpers() {
        let mut store = MemoryBucketStore::new();
        append_to_bucket(&mut store, 0b101, 3, &[4]).unwrap();
        append_to_bucket(&mut store, 0b101, 3, &[9, 2]).unwrap();
        append_to_bucket(&mut store, 0b001, 3, &[1]).unwrap();

        assert_eq!(read_bucket(&store, 0b101, 3).unwrap(), vec![4, 9, 2]);
        assert!(read_bucket(&store, 0b111, 3).unwrap().is_empty());
        assert_eq!(stored_codes(&store, 3).unwrap(), vec![0b001, 0b101]);
    }

    #[test]
    fn test_append_to_corrupt_bucket_fails() {
        let mut store = MemoryBucketStore::new();
        store.put(&[0x01], &[1, 2, 3]).unwrap();
        let err = append_to_bucket(&mut store, 1, 8, &[5]).unwrap_err();
        assert!(err.is_corruption());
    }
}
