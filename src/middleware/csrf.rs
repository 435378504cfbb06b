// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Double-submit CSRF protection.
//!
//! A token is `hex(nonce) "." hex(HMAC-SHA256(key, nonce))`. It is handed to
//! the client in a script-readable cookie, and every state-changing request
//! must echo it back in the `x-csrf-token` header.

use crate::config::Config;
use crate::error::AppError;
use crate::ids::random_bytes;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const CSRF_COOKIE: &str = "oomph_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

const NONCE_LEN: usize = 16;

fn mac_for(key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(nonce);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Issue a fresh token.
pub fn issue_token(key: &[u8]) -> Result<String, AppError> {
    let nonce = random_bytes::<NONCE_LEN>()?;
    let mac = mac_for(key, &nonce)?;
    Ok(format!("{}.{}", hex::encode(nonce), hex::encode(mac)))
}

/// Whether a token carries a valid MAC under `key`.
pub fn verify_token(key: &[u8], token: &str) -> bool {
    let Some((nonce_hex, mac_hex)) = token.split_once('.') else {
        return false;
    };
    let (Ok(nonce), Ok(given)) = (hex::decode(nonce_hex), hex::decode(mac_hex)) else {
        return false;
    };
    if nonce.len() != NONCE_LEN {
        return false;
    }
    match mac_for(key, &nonce) {
        Ok(expected) => expected.ct_eq(&given).into(),
        Err(_) => false,
    }
}

/// Script-readable cookie holding the token.
pub fn csrf_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(false)
        .secure(config.secure_cookies())
        .build()
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Reject state-changing requests without a matching, authentic token.
pub async fn require_csrf(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_safe(request.method()) {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value()).unwrap_or("");

    let matches: bool = header.as_bytes().ct_eq(cookie.as_bytes()).into();
    if header.is_empty() || !matches || !verify_token(&state.config.csrf_key, cookie) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request with missing or invalid CSRF token"
        );
        return Err(AppError::Forbidden("CSRF token mismatch".to_string()));
    }

    Ok(next.run(request).await)
}
