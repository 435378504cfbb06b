// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Accounts and their credentials.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::services::attributes::{self, AttributeSchema, CompressedJson};
use crate::services::fields::FieldUpdater;
use crate::services::metrics::{self, Demographics, Sex};

/// Consecutive failures after which a password is temporarily locked.
pub const LOCKOUT_FAILURES: u32 = 5;
/// How long a lockout lasts after the most recent failure.
pub const LOCKOUT_WINDOW_SECS: f64 = 15.0 * 60.0;

/// Identity root. Stored in `accounts/{encoded id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub blocked_utc: Option<f64>,
    /// ISO `YYYY-MM-DD`
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub sex: Option<Sex>,
    /// Client-side preferences, stored whole.
    #[serde(default)]
    pub config: CompressedJson,
}

impl Account {
    pub fn new(id: i64, created_utc: f64) -> Result<Self, AppError> {
        Ok(Self {
            id,
            created_utc,
            blocked_utc: None,
            birthday: None,
            sex: None,
            config: attributes::compress_json(&Map::new())?,
        })
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_utc.is_some_and(|utc| utc > 0.0)
    }

    /// Apply `config`, `birthday` and `sex` from a partial update.
    ///
    /// Passwords are handled by the caller since they live elsewhere.
    pub fn update_from(&mut self, data: &Map<String, Value>) -> Result<(), AppError> {
        if let Some(config) = data.get("config") {
            if !config.is_object() {
                return Err(AppError::BadRequest("'config' must be an object".to_string()));
            }
            self.config = attributes::compress_json(config)?;
        }

        let fields = FieldUpdater::new(data);
        fields.update_string(&mut self.birthday, "birthday", |b| {
            chrono::NaiveDate::parse_from_str(b, "%Y-%m-%d").is_ok()
        })?;

        match data.get("sex") {
            None => {}
            Some(Value::Null) => self.sex = None,
            Some(Value::String(raw)) => match Sex::parse(raw) {
                Some(sex) => self.sex = Some(sex),
                None => tracing::debug!(value = %raw, "Ignoring unknown sex value"),
            },
            Some(_) => return Err(AppError::BadRequest("'sex' must be a string".to_string())),
        }
        Ok(())
    }

    /// Age and sex for metric formulas, falling back to a profile birthday.
    pub fn demographics(&self, profile: Option<&Profile>, today: chrono::NaiveDate) -> Demographics {
        let profile_birthday = profile.and_then(Profile::birthday);
        let birthday = self.birthday.as_deref().or(profile_birthday.as_deref());
        Demographics {
            age_years: metrics::age_years(birthday, today),
            sex: self.sex,
        }
    }
}

/// An email address bound to one account.
///
/// Stored in `emails/{urlencoded lower-cased address}`, so the document id
/// enforces uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub email: String,
    pub account_id: i64,
    #[serde(default)]
    pub validation_code: Option<String>,
    #[serde(default)]
    pub validated_utc: Option<f64>,
    pub created_utc: f64,
}

impl Email {
    /// Canonical form used for lookups.
    pub fn normalize(address: &str) -> String {
        address.trim().to_lowercase()
    }

    /// Document id for an address.
    pub fn document_id(address: &str) -> String {
        urlencoding::encode(&Self::normalize(address)).into_owned()
    }

    pub fn is_validated(&self) -> bool {
        self.validated_utc.is_some_and(|utc| utc > 0.0)
    }
}

/// A bcrypt password credential. Stored in `passwords/{encoded account id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Password {
    pub account_id: i64,
    pub hash: String,
    pub created_utc: f64,
    #[serde(default)]
    pub last_success_utc: Option<f64>,
    #[serde(default)]
    pub last_failure_utc: Option<f64>,
    #[serde(default)]
    pub failures_since_success: u32,
}

impl Password {
    pub fn new(account_id: i64, hash: String, now: f64) -> Self {
        Self {
            account_id,
            hash,
            created_utc: now,
            last_success_utc: None,
            last_failure_utc: None,
            failures_since_success: 0,
        }
    }

    /// Too many recent failures: refuse to even check the password.
    pub fn is_locked(&self, now: f64) -> bool {
        self.failures_since_success >= LOCKOUT_FAILURES
            && self
                .last_failure_utc
                .is_some_and(|last| now - last < LOCKOUT_WINDOW_SECS)
    }

    pub fn record_failure(&mut self, now: f64) {
        self.last_failure_utc = Some(now);
        self.failures_since_success = self.failures_since_success.saturating_add(1);
    }

    pub fn record_success(&mut self, now: f64) {
        self.last_success_utc = Some(now);
        self.failures_since_success = 0;
    }
}

/// A public-key credential. Stored in `keys/{keyid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub keyid: String,
    pub account_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// SEC1 uncompressed P-256 point, base64url
    pub pubkey: String,
    pub counter: u32,
    /// Outstanding login challenge, base64url
    #[serde(default)]
    pub challenge: Option<String>,
    pub created_utc: f64,
    #[serde(default)]
    pub last_used_utc: Option<f64>,
}

/// Per-account sparse profile. Stored at `{shard}/profile/profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub kv: CompressedJson,
}

impl AttributeSchema for Profile {
    const STRING_KEYS: &'static [&'static str] = &["name", "birthday"];
}

impl Profile {
    pub fn update_from(&mut self, data: &Map<String, Value>) -> Result<(), AppError> {
        self.kv = attributes::merge_for::<Profile>(&self.kv, data)?;
        Ok(())
    }

    /// Birthday string from the attribute bag, if set.
    pub fn birthday(&self) -> Option<String> {
        match attributes::decode(&self.kv).remove("birthday") {
            Some(attributes::AttrValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

// ─── API projections ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct KeyView {
    pub keyid: String,
    pub description: Option<String>,
    pub pubkey: String,
    pub created_utc: f64,
    pub last_used_utc: Option<f64>,
}

impl From<&Key> for KeyView {
    fn from(key: &Key) -> Self {
        Self {
            keyid: key.keyid.clone(),
            description: key.description.clone(),
            pubkey: key.pubkey.clone(),
            created_utc: key.created_utc,
            last_used_utc: key.last_used_utc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthView {
    pub email: Option<String>,
    pub validated_utc: Option<f64>,
    pub last_success_utc: Option<f64>,
    pub last_failure_utc: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub created_utc: f64,
    pub birthday: Option<String>,
    pub sex: Option<Sex>,
    pub age_years: Option<u32>,
    pub max_heart_rate_bpm: Option<f64>,
    pub config: Value,
    pub auth: AuthView,
    pub keys: Vec<KeyView>,
}

impl AccountView {
    pub fn new(
        account: &Account,
        email: Option<&Email>,
        password: Option<&Password>,
        keys: &[Key],
        demographics: Demographics,
    ) -> Self {
        Self {
            id: account.id,
            created_utc: account.created_utc,
            birthday: account.birthday.clone(),
            sex: account.sex,
            age_years: demographics.age_years,
            max_heart_rate_bpm: demographics.max_heart_rate_bpm(),
            config: Value::Object(attributes::decompress_json(&account.config)),
            auth: AuthView {
                email: email.map(|e| e.email.clone()),
                validated_utc: email.and_then(|e| e.validated_utc),
                last_success_utc: password.and_then(|p| p.last_success_utc),
                last_failure_utc: password.and_then(|p| p.last_failure_utc),
            },
            keys: keys.iter().map(KeyView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub kv: Map<String, Value>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            kv: attributes::to_json(&profile.kv),
        }
    }
}
