// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login and logout routes.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::ids;
use crate::middleware::auth::{clear_session_cookie, create_jwt, session_cookie};
use crate::middleware::csrf::{csrf_cookie, issue_token};
use crate::models::{Account, Email, Password, Profile};
use crate::services::fields::valid_password;
use crate::services::{keys, password};
use crate::time_utils::unix_now_f64;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/token", get(get_token))
        .route("/api/register", post(register))
        .route("/api/confirm", post(confirm))
        .route("/api/login", post(login))
        .route("/api/login/key/challenge", post(key_challenge))
        .route("/api/login/key", post(key_login))
        .route("/api/logout", post(logout))
}

/// Fresh CSRF token, echoed in the body for scripts.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub csrf: String,
}

/// Successful login.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub aid: i64,
    pub csrf: String,
}

/// Set a new CSRF cookie and return the token.
fn rotate_csrf(state: &AppState, jar: CookieJar) -> Result<(CookieJar, String)> {
    let token = issue_token(&state.config.csrf_key)?;
    Ok((jar.add(csrf_cookie(&state.config, token.clone())), token))
}

/// Issue a session for `account_id` along with a rotated CSRF token.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    account_id: i64,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let jwt = create_jwt(
        account_id,
        &state.config.jwt_signing_key,
        state.config.session_lifetime_secs,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(&state.config, jwt));
    let (jar, csrf) = rotate_csrf(state, jar)?;

    tracing::info!(account_id, "Session started");
    Ok((
        jar,
        Json(LoginResponse {
            aid: account_id,
            csrf,
        }),
    ))
}

/// Client identity for rate limiting.
///
/// The service runs behind one trusted proxy that appends the peer address
/// to `x-forwarded-for`, so only the last entry is trusted. Earlier entries
/// are client-supplied.
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.rsplit(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

// ─── CSRF Token ──────────────────────────────────────────────

async fn get_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let (jar, csrf) = rotate_csrf(&state, jar)?;
    Ok((jar, Json(TokenResponse { csrf })))
}

// ─── Registration ────────────────────────────────────────────

fn password_policy(password: &str) -> std::result::Result<(), ValidationError> {
    if valid_password(password) {
        Ok(())
    } else {
        Err(ValidationError::new("password_policy").with_message(
            "Password must be 8-64 characters with a letter or digit and a symbol".into(),
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email, length(max = 80))]
    pub email: String,
    #[validate(custom(function = "password_policy"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub aid: i64,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let now = unix_now_f64();
    let account_id = ids::account_id()?;
    let address = Email::normalize(&req.email);
    let code = ids::token_hex::<16>()?;

    let account = Account::new(account_id, now)?;
    let email = Email {
        email: address.clone(),
        account_id,
        validation_code: Some(code.clone()),
        validated_utc: None,
        created_utc: now,
    };
    let hash = password::hash_password(&req.password, state.config.bcrypt_cost).await?;
    let credential = Password::new(account_id, hash, now);

    state
        .db
        .register_account(&account, &email, &credential, &Profile::default())
        .await?;

    // Mail delivery happens elsewhere; the link is logged for development.
    tracing::debug!(
        account_id,
        link = %format!(
            "{}/confirm?email={}&code={}",
            state.config.frontend_url,
            urlencoding::encode(&address),
            code
        ),
        "Email confirmation link"
    );

    Ok((StatusCode::CREATED, Json(RegisterResponse { aid: account_id })))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub validated_utc: f64,
}

async fn confirm(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>> {
    let not_found = || AppError::NotFound("Unknown email or confirmation code".to_string());
    let mut email = state.db.get_email(&req.email).await?.ok_or_else(not_found)?;

    if let Some(validated_utc) = email.validated_utc.filter(|utc| *utc > 0.0) {
        return Ok(Json(ConfirmResponse { validated_utc }));
    }

    let expected = email.validation_code.as_deref().unwrap_or("");
    let matches: bool = expected.as_bytes().ct_eq(req.code.trim().as_bytes()).into();
    if expected.is_empty() || !matches {
        tracing::warn!("Email confirmation with wrong code");
        return Err(not_found());
    }

    let now = unix_now_f64();
    email.validated_utc = Some(now);
    email.validation_code = None;
    state.db.set_email(&email).await?;

    tracing::info!(account_id = email.account_id, "Email confirmed");
    Ok(Json(ConfirmResponse { validated_utc: now }))
}

// ─── Password Login ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let client = client_key(&headers);
    if !state.login_limiter.check(&client) {
        tracing::warn!(client = %client, "Login rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    let email = match state.db.get_email(&req.email).await? {
        Some(email) if email.is_validated() => email,
        _ => {
            tracing::warn!("Login for unknown or unconfirmed email");
            return Err(AppError::Unauthorized);
        }
    };
    let account_id = email.account_id;

    match state.db.get_account(account_id).await? {
        Some(account) if !account.is_blocked() => {}
        _ => {
            tracing::warn!(account_id, "Login for missing or blocked account");
            return Err(AppError::Unauthorized);
        }
    }

    let mut credential = state
        .db
        .get_password(account_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let now = unix_now_f64();
    if credential.is_locked(now) {
        tracing::warn!(account_id, "Login refused: password temporarily locked");
        return Err(AppError::TooManyRequests);
    }

    if !password::verify_password(&req.password, &credential.hash).await? {
        credential.record_failure(now);
        state.db.set_password(&credential).await?;
        tracing::warn!(
            account_id,
            failures = credential.failures_since_success,
            "Login failed: wrong password"
        );
        return Err(AppError::Unauthorized);
    }

    credential.record_success(now);
    state.db.set_password(&credential).await?;

    start_session(&state, jar, account_id)
}

// ─── Key Login ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub keyid: String,
}

#[derive(Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

async fn key_challenge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>> {
    let mut key = state
        .db
        .get_key(&req.keyid)
        .await?
        .ok_or_else(|| AppError::not_found("Key", &req.keyid))?;

    let challenge = keys::encode_b64(&ids::random_bytes::<32>()?);
    key.challenge = Some(challenge.clone());
    state.db.set_key(&key).await?;

    Ok(Json(ChallengeResponse { challenge }))
}

#[derive(Debug, Deserialize)]
pub struct KeyLoginRequest {
    pub keyid: String,
    pub counter: u32,
    /// DER-encoded ECDSA signature, base64url
    pub signature: String,
}

async fn key_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<KeyLoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let mut key = state
        .db
        .get_key(&req.keyid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // A challenge is good for one attempt, successful or not.
    let challenge = key.challenge.take().ok_or(AppError::Unauthorized)?;
    state.db.set_key(&key).await?;

    if req.counter <= key.counter {
        tracing::warn!(keyid = %key.keyid, "Key login with stale counter");
        return Err(AppError::Unauthorized);
    }

    let pubkey = keys::decode_b64(&key.pubkey)?;
    let challenge = keys::decode_b64(&challenge)?;
    let signature = keys::decode_b64(&req.signature)?;
    if !keys::verify_assertion(&pubkey, &challenge, req.counter, &signature) {
        tracing::warn!(keyid = %key.keyid, "Key login with bad signature");
        return Err(AppError::Unauthorized);
    }

    match state.db.get_account(key.account_id).await? {
        Some(account) if !account.is_blocked() => {}
        _ => return Err(AppError::Unauthorized),
    }

    key.counter = req.counter;
    key.last_used_utc = Some(unix_now_f64());
    state.db.set_key(&key).await?;

    tracing::debug!(keyid = %key.keyid, account_id = key.account_id, "Key login");
    start_session(&state, jar, key.account_id)
}

// ─── Logout ──────────────────────────────────────────────────

async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let jar = jar.add(clear_session_cookie(&state.config));
    let (jar, csrf) = rotate_csrf(&state, jar)?;
    Ok((jar, Json(TokenResponse { csrf })))
}
