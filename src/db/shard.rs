// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-account storage shards.
//!
//! Each account's measurement data lives under its own parent document,
//! bucketed two levels deep by the last two characters of the encoded id:
//! `shards/{enc[-1]}/buckets/{enc[-2]}/accounts/{enc}`.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};

/// Encode an account id as URL-safe base64 of its big-endian bytes,
/// dropping the single trailing `=` (always 11 characters).
pub fn encode_id(id: i64) -> String {
    let mut enc = URL_SAFE.encode(id.to_be_bytes());
    enc.pop();
    enc
}

/// Reverse `encode_id`.
pub fn decode_id(enc: &str) -> Option<i64> {
    if enc.len() != 11 {
        return None;
    }
    let bytes = URL_SAFE.decode(format!("{}=", enc)).ok()?;
    let bytes: [u8; 8] = bytes.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}

/// Location of one account's shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardKey {
    pub account_id: i64,
    pub encoded: String,
}

impl ShardKey {
    pub fn new(account_id: i64) -> Self {
        Self {
            account_id,
            encoded: encode_id(account_id),
        }
    }

    /// Path of the shard's parent document, relative to the database's
    /// documents root.
    pub fn document_path(&self) -> String {
        let mut tail = self.encoded.chars().rev();
        let c1 = tail.next().unwrap_or('_');
        let c2 = tail.next().unwrap_or('_');
        format!("shards/{}/buckets/{}/accounts/{}", c1, c2, self.encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_id_known_values() {
        assert_eq!(encode_id(0), "AAAAAAAAAAA");
        assert_eq!(encode_id(1), "AAAAAAAAAAE");
        assert_eq!(encode_id(-1), "__________8");
        assert_eq!(encode_id(i64::MAX).len(), 11);
    }

    #[test]
    fn test_decode_reverses_encode() {
        for id in [0, 1, 42, -1, i64::MIN, i64::MAX, 0x0123_4567_89ab_cdef] {
            assert_eq!(decode_id(&encode_id(id)), Some(id));
        }
        assert_eq!(decode_id("short"), None);
        assert_eq!(decode_id("!!!!!!!!!!!"), None);
    }

    #[test]
    fn test_document_path_buckets_by_trailing_chars() {
        let key = ShardKey::new(1);
        assert_eq!(key.encoded, "AAAAAAAAAAE");
        assert_eq!(key.document_path(), "shards/E/buckets/A/accounts/AAAAAAAAAAE");
    }
}
