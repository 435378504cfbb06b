// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::config::Config;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the HttpOnly session cookie.
pub const SESSION_COOKIE: &str = "oomph_session";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated account extracted from the session.
#[derive(Debug, Clone, Copy)]
pub struct AuthAccount {
    pub account_id: i64,
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.to_string(),
            None => return Err(AppError::Unauthorized),
        }
    };

    let account_id = verify_jwt(&token, &state.config.jwt_signing_key)?;
    request.extensions_mut().insert(AuthAccount { account_id });

    Ok(next.run(request).await)
}

/// Check a session token and return the account it names.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> Result<i64, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;

    token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::InvalidToken)
}

/// Create a JWT for an account session.
pub fn create_jwt(account_id: i64, signing_key: &[u8], lifetime_secs: i64) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = crate::time_utils::unix_now();

    let claims = Claims {
        sub: account_id.to_string(),
        iat: usize::try_from(now)?,
        exp: usize::try_from(now + lifetime_secs)?,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Session cookie carrying a freshly issued JWT.
pub fn session_cookie(config: &Config, jwt: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .secure(config.secure_cookies())
        .max_age(time::Duration::seconds(config.session_lifetime_secs))
        .build()
}

/// Expired session cookie, for logout.
pub fn clear_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .secure(config.secure_cookies())
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn test_jwt_roundtrip() {
        let jwt = create_jwt(42, KEY, 60).unwrap();
        assert_eq!(verify_jwt(&jwt, KEY).unwrap(), 42);
    }

    #[test]
    fn test_jwt_wrong_key() {
        let jwt = create_jwt(42, KEY, 60).unwrap();
        assert!(matches!(
            verify_jwt(&jwt, b"another_key_that_is_long_enough!"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_jwt_expired() {
        // Past the default 60 second leeway.
        let jwt = create_jwt(42, KEY, -120).unwrap();
        assert!(verify_jwt(&jwt, KEY).is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = Config::test_default();
        let cookie = session_cookie(&config, "abc".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));

        let cleared = clear_session_cookie(&config);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
    }
}
