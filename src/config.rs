//! Application configuration loaded from environment variables.
//!
//! A single master secret is read at startup; the session signing key and
//! the CSRF MAC key are derived from it with HKDF so neither is reused.

use hkdf::Hkdf;
use sha2::Sha256;
use std::env;

const HKDF_SALT: &[u8] = b"vitals-tracker/v1";
const SESSION_KEY_INFO: &[u8] = b"session-jwt";
const CSRF_KEY_INFO: &[u8] = b"csrf-mac";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS and cookie security decisions
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Path to the exercise catalog JSON file
    pub exercises_path: String,
    /// Session cookie / JWT lifetime in seconds
    pub session_lifetime_secs: i64,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,

    // --- Derived secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// MAC key for CSRF tokens (raw bytes)
    pub csrf_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret = env::var("SECRET_KEY").map_err(|_| ConfigError::Missing("SECRET_KEY"))?;
        let secret = secret.trim();
        if secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SECRET_KEY",
                "must be at least 32 characters".to_string(),
            ));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 5555)?,
            exercises_path: env::var("EXERCISES_PATH")
                .unwrap_or_else(|_| "data/exercises.json".to_string()),
            session_lifetime_secs: parse_or("SESSION_LIFETIME_SECS", 86_400)?,
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            jwt_signing_key: derive_key(secret.as_bytes(), SESSION_KEY_INFO)?,
            csrf_key: derive_key(secret.as_bytes(), CSRF_KEY_INFO)?,
        })
    }

    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 5555,
            exercises_path: "data/exercises.json".to_string(),
            session_lifetime_secs: 3600,
            bcrypt_cost: 4,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            csrf_key: b"test_csrf_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("could not parse {:?}", raw))),
        Err(_) => Ok(default),
    }
}

/// Derive a 32-byte subkey from the master secret.
fn derive_key(secret: &[u8], info: &[u8]) -> Result<Vec<u8>, ConfigError> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
    let mut okm = vec![0u8; 32];
    hk.expand(info, &mut okm)
        .map_err(|e| ConfigError::Invalid("SECRET_KEY", e.to_string()))?;
    Ok(okm)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("SECRET_KEY", "test-master-secret-with-enough-length!!");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 5555);
        assert_eq!(config.jwt_signing_key.len(), 32);
        assert_ne!(config.jwt_signing_key, config.csrf_key);
    }

    #[test]
    fn test_derived_keys_are_deterministic() {
        let a = derive_key(b"master", SESSION_KEY_INFO).unwrap();
        let b = derive_key(b"master", SESSION_KEY_INFO).unwrap();
        let c = derive_key(b"master", CSRF_KEY_INFO).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_secure_cookies_follow_frontend_scheme() {
        let mut config = Config::test_default();
        assert!(!config.secure_cookies());
        config.frontend_url = "https://vitals.example.com".to_string();
        assert!(config.secure_cookies());
    }
}
