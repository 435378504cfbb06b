// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise catalog, workout and set routes.

use crate::db::ShardKey;
use crate::error::{AppError, Result};
use crate::ids;
use crate::middleware::auth::AuthAccount;
use crate::models::collection::CollectionView;
use crate::models::exercise::Exercise;
use crate::models::workout::{SetView, WorkoutView};
use crate::models::{Collection, Flavor, Set, Workout};
use crate::routes::json_object;
use crate::services::track;
use crate::time_utils::unix_now_f64;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/exercises", get(list_exercises))
        .route("/api/workouts", post(create_workout))
        .route("/api/workout/{id}", get(get_workout).post(update_workout))
        .route("/api/workout/{id}/sets", post(add_set))
        .route("/api/set/{id}", post(update_set).delete(delete_set))
        .route("/api/set/{id}/track", get(get_track))
}

// ─── Helpers ─────────────────────────────────────────────────

/// Keys of a workout update that belong to the collection.
///
/// `goals` is stored on the workout and the flavor is fixed.
fn collection_fields(data: &Map<String, Value>) -> Map<String, Value> {
    data.iter()
        .filter(|(key, _)| !matches!(key.as_str(), "goals" | "flavor"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Canonical catalog name for a requested exercise.
fn exercise_name(state: &AppState, value: Option<&Value>) -> Result<String> {
    let requested = value
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("'exercise' must be a string".to_string()))?;
    state
        .exercises
        .find(requested)
        .map(|e| e.name.clone())
        .ok_or_else(|| AppError::BadRequest(format!("Unknown exercise '{}'", requested)))
}

async fn load_workout(
    state: &AppState,
    shard: &ShardKey,
    id: i64,
) -> Result<(Workout, Collection)> {
    let workout = state
        .db
        .get_workout(shard, id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout", id))?;
    let collection = state
        .db
        .get_collection(shard, id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout", id))?;
    Ok((workout, collection))
}

async fn workout_view(
    state: &AppState,
    shard: &ShardKey,
    workout: &Workout,
    collection: &Collection,
) -> Result<WorkoutView> {
    let sets = state.db.sets_for_workout(shard, workout.id).await?;
    let snapshot_ids = state
        .db
        .snapshots_in_collection(shard, collection.id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();

    Ok(WorkoutView {
        id: workout.id,
        created_utc: workout.created_utc,
        goals: workout.goals_json(),
        collection: CollectionView::new(collection, snapshot_ids),
        sets: sets.iter().map(SetView::from).collect(),
    })
}

async fn load_set(state: &AppState, shard: &ShardKey, id: i64) -> Result<Set> {
    state
        .db
        .get_set(shard, id)
        .await?
        .ok_or_else(|| AppError::not_found("Set", id))
}

// ─── Exercises ───────────────────────────────────────────────

async fn list_exercises(State(state): State<Arc<AppState>>) -> Json<Vec<Exercise>> {
    Json(state.exercises.exercises().to_vec())
}

// ─── Workouts ────────────────────────────────────────────────

async fn create_workout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<WorkoutView>)> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    let now = unix_now_f64();
    let id = ids::record_id()?;

    let mut collection = Collection::new(id, now, Some(Flavor::Workout));
    let added = collection.update_from(&collection_fields(&data))?;
    let mut workout = Workout::new(id, now);
    workout.update_from(&data)?;

    if !added.is_empty() {
        state.db.ensure_tags(&added).await?;
    }
    state.db.save_workout(&shard, &collection, &workout).await?;
    tracing::debug!(account_id = auth.account_id, workout_id = id, "Workout created");

    Ok((
        StatusCode::CREATED,
        Json(workout_view(&state, &shard, &workout, &collection).await?),
    ))
}

async fn get_workout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<Json<WorkoutView>> {
    let shard = ShardKey::new(auth.account_id);
    let (workout, collection) = load_workout(&state, &shard, id).await?;
    Ok(Json(workout_view(&state, &shard, &workout, &collection).await?))
}

async fn update_workout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<WorkoutView>> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    let (mut workout, mut collection) = load_workout(&state, &shard, id).await?;

    workout.update_from(&data)?;
    let added = collection.update_from(&collection_fields(&data))?;

    if !added.is_empty() {
        state.db.ensure_tags(&added).await?;
    }
    state.db.save_workout(&shard, &collection, &workout).await?;

    Ok(Json(workout_view(&state, &shard, &workout, &collection).await?))
}

// ─── Sets ────────────────────────────────────────────────────

async fn add_set(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(workout_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SetView>)> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    if state.db.get_workout(&shard, workout_id).await?.is_none() {
        return Err(AppError::not_found("Workout", workout_id));
    }

    let exercise = exercise_name(&state, data.get("exercise"))?;
    let mut set = Set::new(ids::record_id()?, workout_id, exercise);
    set.update_from(&data)?;
    state.db.set_set(&shard, &set).await?;

    tracing::debug!(workout_id, set_id = set.id, exercise = %set.exercise, "Set added");
    Ok((StatusCode::CREATED, Json(SetView::from(&set))))
}

async fn update_set(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<SetView>> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    let mut set = load_set(&state, &shard, id).await?;

    if data.contains_key("exercise") {
        set.exercise = exercise_name(&state, data.get("exercise"))?;
    }
    set.update_from(&data)?;
    state.db.set_set(&shard, &set).await?;

    Ok(Json(SetView::from(&set)))
}

async fn delete_set(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let shard = ShardKey::new(auth.account_id);
    load_set(&state, &shard, id).await?;
    state.db.delete_set(&shard, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The set's GPS track as a GeoJSON feature.
async fn get_track(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<Json<geojson::Feature>> {
    let shard = ShardKey::new(auth.account_id);
    let set = load_set(&state, &shard, id).await?;
    let encoded = set
        .gps_polyline
        .as_deref()
        .ok_or_else(|| AppError::NotFound(format!("Set {} has no track", id)))?;

    let line = track::decode_track(encoded)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored track is invalid: {}", e)))?;
    let distance_m = track::track_length_m(&line);
    let properties = track::track_properties(set.id, distance_m, line.0.len());

    Ok(Json(track::track_feature(&line, properties)))
}
