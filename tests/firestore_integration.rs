// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at a local emulator.
//!
//! The emulator provides a clean state for each test run.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use vitals_tracker::db::ShardKey;
use vitals_tracker::error::AppError;
use vitals_tracker::ids;
use vitals_tracker::models::{
    Account, Collection, Email, Flavor, Key, Password, Profile, Set, Snapshot, Workout,
};
use vitals_tracker::services::metrics::Sex;

mod common;
use common::test_db;

fn new_account() -> (Account, Email, Password) {
    let id = ids::account_id().unwrap();
    let account = Account::new(id, 1_700_000_000.0).unwrap();
    let email = Email {
        email: format!("user{}@example.com", id),
        account_id: id,
        validation_code: Some("code".to_string()),
        validated_utc: None,
        created_utc: 1_700_000_000.0,
    };
    let password = Password::new(id, "$2b$04$hash".to_string(), 1_700_000_000.0);
    (account, email, password)
}

fn data(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// ACCOUNT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_register_account() {
    require_emulator!();

    let db = test_db().await;
    let (account, email, password) = new_account();

    db.register_account(&account, &email, &password, &Profile::default())
        .await
        .unwrap();

    let fetched = db.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, account.id);

    // Lookup is case-insensitive
    let fetched_email = db
        .get_email(&email.email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched_email.account_id, account.id);

    let fetched_password = db.get_password(account.id).await.unwrap().unwrap();
    assert_eq!(fetched_password.hash, password.hash);

    let shard = ShardKey::new(account.id);
    assert!(db.get_profile(&shard).await.unwrap().is_some());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let (account, email, password) = new_account();
    db.register_account(&account, &email, &password, &Profile::default())
        .await
        .unwrap();

    let (other, mut other_email, other_password) = new_account();
    other_email.email = email.email.clone();
    other_email.account_id = other.id;

    let result = db
        .register_account(&other, &other_email, &other_password, &Profile::default())
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(db.get_account(other.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_keys() {
    require_emulator!();

    let db = test_db().await;
    let account_id = ids::account_id().unwrap();
    let key = Key {
        keyid: format!("key-{}", account_id),
        account_id,
        description: Some("laptop".to_string()),
        pubkey: "BAAA".to_string(),
        counter: 0,
        challenge: None,
        created_utc: 1_700_000_000.0,
        last_used_utc: None,
    };

    db.insert_key(&key).await.unwrap();
    assert!(matches!(db.insert_key(&key).await, Err(AppError::Conflict(_))));

    let keys = db.keys_for_account(account_id).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].description.as_deref(), Some("laptop"));

    db.delete_key(&key.keyid).await.unwrap();
    assert!(db.get_key(&key.keyid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_weak_password_skipped_on_account_update() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let (account, email, password) = new_account();
    state
        .db
        .register_account(&account, &email, &password, &Profile::default())
        .await
        .unwrap();

    let token = common::session_token(&state, account.id);
    let csrf = common::csrf_token(&state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/account")
                .header(
                    header::COOKIE,
                    format!("oomph_session={}; oomph_csrf={}", token, csrf),
                )
                .header("x-csrf-token", csrf.as_str())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"password": "short", "sex": "female"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // The other fields still apply.
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["sex"], "female");

    let stored = state.db.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(stored.sex, Some(Sex::Female));
    let credential = state.db.get_password(account.id).await.unwrap().unwrap();
    assert_eq!(credential.hash, password.hash);
}

// ═══════════════════════════════════════════════════════════════════════════
// TAG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_concurrent_tag_creation_converges() {
    require_emulator!();

    let db = test_db().await;
    let name = format!("tag{}", ids::record_id().unwrap());
    let names = vec![name.clone()];

    let results = futures_util::future::join_all((0..8).map(|_| db.ensure_tags(&names))).await;

    let created: Vec<f64> = results
        .into_iter()
        .map(|r| r.unwrap()[0].created_utc)
        .collect();
    // Every caller sees the single stored record.
    let stored = db.get_tag(&name).await.unwrap().unwrap();
    assert!(created.iter().all(|utc| *utc == stored.created_utc));
}

// ═══════════════════════════════════════════════════════════════════════════
// SHARD TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_snapshot_queries() {
    require_emulator!();

    let db = test_db().await;
    let shard = ShardKey::new(ids::account_id().unwrap());

    let collection = Collection::new(ids::record_id().unwrap(), 1_000.0, Some(Flavor::Habit));
    db.set_collection(&shard, &collection).await.unwrap();

    for utc in [1_000.0, 2_000.0, 3_000.0, 4_000.0] {
        let mut snapshot = Snapshot::new(ids::record_id().unwrap(), utc);
        if utc < 2_500.0 {
            snapshot.collection_id = Some(collection.id);
        }
        db.set_snapshot(&shard, &snapshot).await.unwrap();
    }

    let recent = db.recent_snapshots(&shard, 3).await.unwrap();
    let utcs: Vec<f64> = recent.iter().map(|s| s.utc).collect();
    assert_eq!(utcs, vec![4_000.0, 3_000.0, 2_000.0]);

    let range = db.snapshots_between(&shard, 1_500.0, 3_000.0).await.unwrap();
    assert_eq!(range.len(), 2);

    assert_eq!(
        db.snapshots_in_collection(&shard, collection.id)
            .await
            .unwrap()
            .len(),
        2
    );

    let habits = db.collections_with_flavor(&shard, Flavor::Habit).await.unwrap();
    assert_eq!(habits.len(), 1);

    // Deleting the collection keeps its snapshots, detached.
    db.delete_collection(&shard, collection.id).await.unwrap();
    assert!(db.get_collection(&shard, collection.id).await.unwrap().is_none());
    assert!(db
        .snapshots_in_collection(&shard, collection.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(db.recent_snapshots(&shard, 10).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_shards_are_isolated() {
    require_emulator!();

    let db = test_db().await;
    let mine = ShardKey::new(ids::account_id().unwrap());
    let theirs = ShardKey::new(ids::account_id().unwrap());

    let snapshot = Snapshot::new(ids::record_id().unwrap(), 1_000.0);
    db.set_snapshot(&mine, &snapshot).await.unwrap();

    assert!(db.get_snapshot(&mine, snapshot.id).await.unwrap().is_some());
    assert!(db.get_snapshot(&theirs, snapshot.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_workout_sets() {
    require_emulator!();

    let db = test_db().await;
    let shard = ShardKey::new(ids::account_id().unwrap());
    let id = ids::record_id().unwrap();

    let collection = Collection::new(id, 1_000.0, Some(Flavor::Workout));
    let workout = Workout::new(id, 1_000.0);
    db.save_workout(&shard, &collection, &workout).await.unwrap();

    let mut later = Set::new(ids::record_id().unwrap(), id, "Run".to_string());
    later
        .update_from(&data(json!({"start_utc": 2_000, "distance_m": 5000})))
        .unwrap();
    let mut earlier = Set::new(ids::record_id().unwrap(), id, "Back Squat".to_string());
    earlier
        .update_from(&data(json!({"start_utc": 1_000, "reps": 5})))
        .unwrap();
    db.set_set(&shard, &later).await.unwrap();
    db.set_set(&shard, &earlier).await.unwrap();

    let sets = db.sets_for_workout(&shard, id).await.unwrap();
    let exercises: Vec<&str> = sets.iter().map(|s| s.exercise.as_str()).collect();
    assert_eq!(exercises, vec!["Back Squat", "Run"]);

    // Deleting the collection removes the workout and its sets.
    db.delete_collection(&shard, id).await.unwrap();
    assert!(db.get_workout(&shard, id).await.unwrap().is_none());
    assert!(db.get_set(&shard, later.id).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// DELETION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_account_data() {
    require_emulator!();

    let db = test_db().await;
    let (account, email, password) = new_account();
    db.register_account(&account, &email, &password, &Profile::default())
        .await
        .unwrap();

    let shard = ShardKey::new(account.id);
    let snapshot = Snapshot::new(ids::record_id().unwrap(), 1_000.0);
    db.set_snapshot(&shard, &snapshot).await.unwrap();

    let deleted = db.delete_account_data(account.id).await.unwrap();
    assert!(deleted >= 5, "deleted {}", deleted);

    assert!(db.get_account(account.id).await.unwrap().is_none());
    assert!(db.get_email(&email.email).await.unwrap().is_none());
    assert!(db.get_password(account.id).await.unwrap().is_none());
    assert!(db.get_profile(&shard).await.unwrap().is_none());
    assert!(db.get_snapshot(&shard, snapshot.id).await.unwrap().is_none());
}
