// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use vitals_tracker::config::Config;
use vitals_tracker::db::FirestoreDb;
use vitals_tracker::middleware::auth::create_jwt;
use vitals_tracker::middleware::csrf::issue_token;
use vitals_tracker::routes::create_router;
use vitals_tracker::services::{ExerciseCatalog, LoginLimiter};
use vitals_tracker::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Exercise catalog shipped with the repository.
#[allow(dead_code)]
pub fn test_exercises() -> ExerciseCatalog {
    ExerciseCatalog::load_from_file("data/exercises.json").expect("Failed to load exercises")
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app whose cookies follow the given frontend URL.
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    create_test_app_with_config(config)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    build_app(Config::test_default(), test_db().await)
}

fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    build_app(config, test_db_offline())
}

fn build_app(config: Config, db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config,
        db,
        exercises: test_exercises(),
        login_limiter: LoginLimiter::default(),
    });

    (create_router(state.clone()), state)
}

/// Session token for an account.
#[allow(dead_code)]
pub fn session_token(state: &AppState, account_id: i64) -> String {
    create_jwt(
        account_id,
        &state.config.jwt_signing_key,
        state.config.session_lifetime_secs,
    )
    .expect("Failed to create JWT")
}

/// A valid CSRF token for the app's key.
#[allow(dead_code)]
pub fn csrf_token(state: &AppState) -> String {
    issue_token(&state.config.csrf_key).expect("Failed to issue CSRF token")
}
