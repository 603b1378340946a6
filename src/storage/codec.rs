//! Byte layout of bucket keys and payloads.
//!
//! Keys are the code in `ceil(m / 8)` big-endian bytes, so byte order equals
//! numeric order. Payloads are concatenated 8-byte big-endian object ids.

use crate::error::{Result, SketchError};
use crate::types::{code_mask, Code, ObjectId};
use crate::utils::code_key_len;

/// Fixed-width big-endian key for a code.
pub fn encode_code_key(code: Code, bits: u32) -> Vec<u8> {
    let len = code_key_len(bits);
    code.to_be_bytes()[8 - len..].to_vec()
}

/// Decode a key produced by [`encode_code_key`].
pub fn decode_code_key(key: &[u8], bits: u32) -> Result<Code> {
    let len = code_key_len(bits);
    if key.len() != len {
        return Err(SketchError::corrupt_index(format!(
            "bucket key has {} bytes, expected {} for {} bits",
            key.len(),
            len,
            bits
        )));
    }
    let mut bytes = [0u8; 8];
    bytes[8 - len..].copy_from_slice(key);
    let code = Code::from_be_bytes(bytes);
    if code & !code_mask(bits) != 0 {
        return Err(SketchError::corrupt_index(format!(
            "bucket key {:#x} exceeds {} bits",
            code, bits
        )));
    }
    Ok(code)
}

/// Serialize bucket ids.
pub fn encode_bucket(ids: &[ObjectId]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ids.len() * 8);
    for id in ids {
        out.extend_from_slice(&id.to_be_bytes());
    }
    out
}

/// Deserialize bucket ids.
pub fn decode_bucket(payload: &[u8]) -> Result<Vec<ObjectId>> {
    if payload.len() % 8 != 0 {
        return Err(SketchError::corrupt_index(format!(
            "bucket payload of {} bytes is not a whole number of ids",
            payload.len()
        )));
    }
    Ok(payload
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            ObjectId::from_be_bytes(bytes)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_key_width_and_layout() {
        assert_eq!(encode_code_key(0x0102, 16), vec![0x01, 0x02]);
        assert_eq!(encode_code_key(0x5, 3), vec![0x05]);
        assert_eq!(encode_code_key(0x0102, 20), vec![0x00, 0x01, 0x02]);
        assert_eq!(encode_code_key(u64::MAX, 64), vec![0xFF; 8]);
    }

    #[test]
    fn test_key_byte_order_matches_numeric_order() {
        let mut codes: Vec<Code> = vec![0x1FF, 0x2, 0x100, 0xFF, 0x0];
        let mut keys: Vec<Vec<u8>> = codes.iter().map(|&c| encode_code_key(c, 12)).collect();
        codes.sort_unstable();
        keys.sort();
        let decoded: Vec<Code> = keys.iter().map(|k| decode_code_key(k, 12).unwrap()).collect();
        assert_eq!(decoded, codes);
    }

    #[test]
    fn test_bad_keys_are_corruption() {
        assert_eq!(
            decode_code_key(&[0x01, 0x02], 8).unwrap_err().code(),
            ErrorCode::CorruptIndex
        );
        // 0x1F needs 5 bits
        assert_eq!(
            decode_code_key(&[0x1F], 4).unwrap_err().code(),
            ErrorCode::CorruptIndex
        );
    }

    #[test]
    fn test_bucket_payload() {
        let ids = vec![0, 7, u64::MAX];
        let payload = encode_bucket(&ids);
        assert_eq!(payload.len(), 24);
        assert_eq!(&payload[8..16], &[0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(decode_bucket(&payload).unwrap(), ids);
        assert!(decode_bucket(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_payload_is_corruption() {
        let err = decode_bucket(&[0u8; 9]).unwrap_err();
        assert!(err.is_corruption());
    }
}
