// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Random identifiers and secret tokens.

use crate::error::AppError;
use ring::rand::{SecureRandom, SystemRandom};

/// Largest integer a JavaScript client can represent exactly.
const JS_SAFE_MASK: u64 = (1 << 53) - 1;

/// Fill a fixed-size buffer from the system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], AppError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(buf)
}

/// A random 63-bit account identifier (non-negative as `i64`).
pub fn account_id() -> Result<i64, AppError> {
    let raw = u64::from_be_bytes(random_bytes::<8>()?) >> 1;
    Ok(raw as i64)
}

/// A random positive record identifier that survives a round trip through JSON numbers.
pub fn record_id() -> Result<i64, AppError> {
    loop {
        let raw = u64::from_be_bytes(random_bytes::<8>()?) & JS_SAFE_MASK;
        if raw != 0 {
            return Ok(raw as i64);
        }
    }
}

/// Hex-encoded random token of `N` bytes.
pub fn token_hex<const N: usize>() -> Result<String, AppError> {
    Ok(hex::encode(random_bytes::<N>()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_is_non_negative() {
        for _ in 0..100 {
            assert!(account_id().unwrap() >= 0);
        }
    }

    #[test]
    fn test_record_id_is_js_safe() {
        for _ in 0..100 {
            let id = record_id().unwrap();
            assert!(id > 0);
            assert!(id as u64 <= JS_SAFE_MASK);
        }
    }

    #[test]
    fn test_token_hex_length() {
        assert_eq!(token_hex::<32>().unwrap().len(), 64);
    }
}
