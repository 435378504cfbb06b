// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! bcrypt password hashing.
//!
//! Hashing is CPU-bound, so both operations run on the blocking pool.

use crate::error::AppError;
use crate::services::fields::valid_password;
use serde_json::Value;

/// Hash a password with the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hash task failed: {}", e)))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

/// Check a password against a stored hash. A malformed hash never matches.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))
}

/// Hash for a requested password change, or `None` when the change is skipped.
///
/// A value that is not a string, fails the password policy, or matches the
/// current password leaves the credential as it is.
pub async fn replacement_hash(
    requested: &Value,
    current_hash: &str,
    cost: u32,
) -> Result<Option<String>, AppError> {
    let Some(requested) = requested.as_str().filter(|p| valid_password(p)) else {
        tracing::debug!("Ignoring password that fails the policy");
        return Ok(None);
    };
    if verify_password(requested, current_hash).await? {
        tracing::debug!("Ignoring password equal to the current one");
        return Ok(None);
    }
    hash_password(requested, cost).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("hunter2!", 4).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("hunter2!", &hash).await.unwrap());
        assert!(!verify_password("hunter3!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_match() {
        assert!(!verify_password("anything", "not-a-hash").await.unwrap());
    }

    #[tokio::test]
    async fn test_replacement_hash_skips_weak_password() {
        let current = hash_password("hunter2!", 4).await.unwrap();
        for requested in [json!("short"), json!("password"), json!(12345678), json!(null)] {
            assert_eq!(
                replacement_hash(&requested, &current, 4).await.unwrap(),
                None,
                "requested: {}",
                requested
            );
        }
    }

    #[tokio::test]
    async fn test_replacement_hash_skips_current_password() {
        let current = hash_password("hunter2!", 4).await.unwrap();
        assert_eq!(
            replacement_hash(&json!("hunter2!"), &current, 4).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_replacement_hash_for_new_password() {
        let current = hash_password("hunter2!", 4).await.unwrap();
        let hash = replacement_hash(&json!("correct horse"), &current, 4)
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("hunter2!", &hash).await.unwrap());
    }
}
