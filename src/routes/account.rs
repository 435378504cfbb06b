// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account, profile and key management for the signed-in account.

use crate::db::ShardKey;
use crate::error::{AppError, Result};
use crate::middleware::auth::{clear_session_cookie, AuthAccount};
use crate::models::account::{AccountView, KeyView, ProfileView};
use crate::models::{Key, Profile};
use crate::routes::json_object;
use crate::services::{keys, password};
use crate::time_utils::{today_utc, unix_now_f64};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest accepted credential id or key description.
const MAX_KEY_FIELD_LEN: usize = 256;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/account",
            get(get_account).post(update_account).delete(delete_account),
        )
        .route("/api/profile", get(get_profile).post(update_profile))
        .route("/api/keys", get(list_keys).post(add_key))
        .route("/api/keys/{keyid}", delete(remove_key))
}

// ─── Account ─────────────────────────────────────────────────

async fn account_view(state: &AppState, account_id: i64) -> Result<AccountView> {
    let account = state
        .db
        .get_account(account_id)
        .await?
        .ok_or_else(|| AppError::not_found("Account", account_id))?;

    let emails = state.db.emails_for_account(account_id).await?;
    let password = state.db.get_password(account_id).await?;
    let keys = state.db.keys_for_account(account_id).await?;
    let profile = state.db.get_profile(&ShardKey::new(account_id)).await?;
    let demographics = account.demographics(profile.as_ref(), today_utc());

    Ok(AccountView::new(
        &account,
        emails.first(),
        password.as_ref(),
        &keys,
        demographics,
    ))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<AccountView>> {
    Ok(Json(account_view(&state, auth.account_id).await?))
}

/// Update `config`, `birthday`, `sex` and optionally the password.
///
/// A password that fails the policy is skipped; the other fields still apply.
async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<Value>,
) -> Result<Json<AccountView>> {
    let data = json_object(body)?;
    let account_id = auth.account_id;

    let mut account = state
        .db
        .get_account(account_id)
        .await?
        .ok_or_else(|| AppError::not_found("Account", account_id))?;
    account.update_from(&data)?;

    if let Some(requested) = data.get("password") {
        let mut credential = state
            .db
            .get_password(account_id)
            .await?
            .ok_or_else(|| AppError::not_found("Password", account_id))?;
        if let Some(hash) =
            password::replacement_hash(requested, &credential.hash, state.config.bcrypt_cost)
                .await?
        {
            credential.hash = hash;
            credential.created_utc = unix_now_f64();
            state.db.set_password(&credential).await?;
            tracing::info!(account_id, "Password changed");
        }
    }

    state.db.set_account(&account).await?;

    Ok(Json(account_view(&state, account_id).await?))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub deleted_count: usize,
}

/// Delete the account and all associated data, and end the session.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeleteAccountResponse>)> {
    tracing::info!(account_id = auth.account_id, "User-initiated account deletion");

    let deleted_count = state.db.delete_account_data(auth.account_id).await?;

    Ok((
        jar.add(clear_session_cookie(&state.config)),
        Json(DeleteAccountResponse {
            success: true,
            deleted_count,
        }),
    ))
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<ProfileView>> {
    let profile = state
        .db
        .get_profile(&ShardKey::new(auth.account_id))
        .await?
        .unwrap_or_default();
    Ok(Json(ProfileView::from(&profile)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<Value>,
) -> Result<Json<ProfileView>> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);

    let mut profile: Profile = state.db.get_profile(&shard).await?.unwrap_or_default();
    profile.update_from(&data)?;
    state.db.set_profile(&shard, &profile).await?;

    Ok(Json(ProfileView::from(&profile)))
}

// ─── Keys ────────────────────────────────────────────────────

async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Vec<KeyView>>> {
    let keys = state.db.keys_for_account(auth.account_id).await?;
    Ok(Json(keys.iter().map(KeyView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddKeyRequest {
    pub keyid: String,
    /// SEC1 uncompressed P-256 point, base64url
    pub pubkey: String,
    #[serde(default)]
    pub description: Option<String>,
}

async fn add_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(req): Json<AddKeyRequest>,
) -> Result<(StatusCode, Json<KeyView>)> {
    let keyid = req.keyid.trim();
    if keyid.is_empty() || keyid.len() > MAX_KEY_FIELD_LEN {
        return Err(AppError::BadRequest("Invalid key id".to_string()));
    }
    let pubkey = keys::parse_public_key(&req.pubkey)?;
    let description = req
        .description
        .map(|d| d.trim().chars().take(MAX_KEY_FIELD_LEN).collect::<String>())
        .filter(|d| !d.is_empty());

    let key = Key {
        keyid: keyid.to_string(),
        account_id: auth.account_id,
        description,
        pubkey: keys::encode_b64(&pubkey),
        counter: 0,
        challenge: None,
        created_utc: unix_now_f64(),
        last_used_utc: None,
    };
    state.db.insert_key(&key).await?;

    tracing::info!(account_id = auth.account_id, keyid = %key.keyid, "Key registered");
    Ok((StatusCode::CREATED, Json(KeyView::from(&key))))
}

async fn remove_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(keyid): Path<String>,
) -> Result<StatusCode> {
    match state.db.get_key(&keyid).await? {
        Some(key) if key.account_id == auth.account_id => {
            state.db.delete_key(&keyid).await?;
            tracing::info!(account_id = auth.account_id, keyid = %keyid, "Key removed");
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(AppError::not_found("Key", &keyid)),
    }
}
