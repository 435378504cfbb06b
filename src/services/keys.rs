// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public-key login credentials.
//!
//! A registered key is an ECDSA P-256 public key (SEC1 uncompressed point).
//! To log in, the client requests a challenge and signs
//! `challenge || counter` where `counter` is a big-endian u32 that must
//! increase on every use.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};

use crate::error::AppError;

/// Length of an uncompressed P-256 point.
const P256_POINT_LEN: usize = 65;

/// Decode base64url, with or without padding.
pub fn decode_b64(raw: &str) -> Result<Vec<u8>, AppError> {
    URL_SAFE_NO_PAD
        .decode(raw.trim().trim_end_matches('='))
        .map_err(|_| AppError::BadRequest("Invalid base64url value".to_string()))
}

pub fn encode_b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate a public key submitted for registration.
pub fn parse_public_key(raw: &str) -> Result<Vec<u8>, AppError> {
    let key = decode_b64(raw)?;
    if key.len() != P256_POINT_LEN || key[0] != 0x04 {
        return Err(AppError::BadRequest(
            "Public key must be an uncompressed P-256 point".to_string(),
        ));
    }
    Ok(key)
}

/// The bytes a client signs to answer a challenge.
pub fn signed_message(challenge: &[u8], counter: u32) -> Vec<u8> {
    let mut message = Vec::with_capacity(challenge.len() + 4);
    message.extend_from_slice(challenge);
    message.extend_from_slice(&counter.to_be_bytes());
    message
}

/// Verify a DER-encoded ECDSA signature over `challenge || counter`.
pub fn verify_assertion(pubkey: &[u8], challenge: &[u8], counter: u32, signature: &[u8]) -> bool {
    UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, pubkey)
        .verify(&signed_message(challenge, counter), signature)
        .is_ok()
}
