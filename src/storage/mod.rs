//! Bucket storage.
//!
//! A bucket holds the ids of every object sharing one exact sketch code.
//! Buckets live in an external byte-oriented key/value store; this module
//! defines that collaborator and the byte layout of keys and payloads.

mod codec;
mod memory;

pub use codec::{decode_bucket, decode_code_key, encode_bucket, encode_code_key};
pub use memory::MemoryBucketStore;

use crate::error::{Result, SketchError};
use crate::types::{Code, ObjectId};

/// Byte-oriented key/value store holding buckets.
pub trait BucketStore {
    /// Fetch a payload; `Ok(None)` when the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite a payload.
    fn put(&mut self, key: &[u8], payload: &[u8]) -> Result<()>;

    /// Every `(key, payload)` pair, in ascending key order.
    fn iterate_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Ids in the bucket for `code`; an absent bucket is empty.
pub fn read_bucket<B: BucketStore + ?Sized>(
    store: &B,
    code: Code,
    bits: u32,
) -> Result<Vec<ObjectId>> {
    match store.get(&encode_code_key(code, bits))? {
        Some(payload) => decode_bucket(&payload),
        None => Ok(Vec::new()),
    }
}

/// Append ids to the bucket for `code`.
pub fn append_to_bucket<B: BucketStore + ?Sized>(
    store: &mut B,
    code: Code,
    bits: u32,
    ids: &[ObjectId],
) -> Result<()> {
    let key = encode_code_key(code, bits);
    let mut payload = store.get(&key)?.unwrap_or_default();
    if payload.len() % 8 != 0 {
        return Err(SketchError::corrupt_index(format!(
            "bucket {:#x} has a {}-byte payload",
            code,
            payload.len()
        )));
    }
    payload.extend_from_slice(&encode_bucket(ids));
    store.put(&key, &payload)
}

/// Every code with a persisted bucket, ascending.
pub fn stored_codes<B: BucketStore + ?Sized>(store: &B, bits: u32) -> Result<Vec<Code>> {
    store
        .iterate_all()?
        .iter()
        .map(|(key, _)| decode_code_key(key, bits))
        .collect()
}
