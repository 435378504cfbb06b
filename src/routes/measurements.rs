// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Snapshot and collection routes.

use crate::db::ShardKey;
use crate::error::{AppError, Result};
use crate::ids;
use crate::middleware::auth::AuthAccount;
use crate::models::collection::CollectionView;
use crate::models::snapshot::SnapshotView;
use crate::models::{Collection, Flavor, Snapshot, Workout};
use crate::routes::{json_object, load_demographics};
use crate::services::fields::parse_int;
use crate::time_utils::unix_now_f64;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Snapshots shown on the dashboard.
const DASHBOARD_SNAPSHOTS: u32 = 3;
/// Default timeline span, in seconds.
const DEFAULT_TIMELINE_SECS: f64 = 90.0 * 24.0 * 60.0 * 60.0;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/habits", get(habits))
        .route("/api/timeline", get(timeline))
        .route("/api/snapshots", post(create_snapshot))
        .route(
            "/api/snapshot/{id}",
            get(get_snapshot).post(update_snapshot).delete(delete_snapshot),
        )
        .route("/api/collections", post(create_collection))
        .route(
            "/api/collection/{id}",
            get(get_collection)
                .post(update_collection)
                .delete(delete_collection),
        )
}

// ─── Helpers ─────────────────────────────────────────────────

async fn collection_view(
    state: &AppState,
    shard: &ShardKey,
    collection: &Collection,
) -> Result<CollectionView> {
    let snapshot_ids = state
        .db
        .snapshots_in_collection(shard, collection.id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();
    Ok(CollectionView::new(collection, snapshot_ids))
}

/// Store a collection, creating its workout record when it has the
/// workout flavor and none exists yet.
async fn save_collection(
    state: &AppState,
    shard: &ShardKey,
    collection: &Collection,
    added_tags: &[String],
) -> Result<()> {
    if !added_tags.is_empty() {
        state.db.ensure_tags(added_tags).await?;
    }

    if collection.flavor == Some(Flavor::Workout)
        && state.db.get_workout(shard, collection.id).await?.is_none()
    {
        let workout = Workout::new(collection.id, unix_now_f64());
        return state.db.save_workout(shard, collection, &workout).await;
    }
    state.db.set_collection(shard, collection).await
}

/// Apply `collection_id` from an update.
///
/// Unknown collections are skipped rather than rejected.
async fn link_collection(
    state: &AppState,
    shard: &ShardKey,
    snapshot: &mut Snapshot,
    data: &Map<String, Value>,
) -> Result<()> {
    match data.get("collection_id") {
        None => {}
        Some(Value::Null) => snapshot.collection_id = None,
        Some(value) => {
            let id = parse_int(value).ok_or_else(|| {
                AppError::BadRequest("'collection_id' must be an integer".to_string())
            })?;
            if state.db.get_collection(shard, id).await?.is_some() {
                snapshot.collection_id = Some(id);
            } else {
                tracing::debug!(collection_id = id, "Ignoring unknown collection");
            }
        }
    }
    Ok(())
}

async fn load_snapshot(state: &AppState, shard: &ShardKey, id: i64) -> Result<Snapshot> {
    state
        .db
        .get_snapshot(shard, id)
        .await?
        .ok_or_else(|| AppError::not_found("Snapshot", id))
}

async fn load_collection(state: &AppState, shard: &ShardKey, id: i64) -> Result<Collection> {
    state
        .db
        .get_collection(shard, id)
        .await?
        .ok_or_else(|| AppError::not_found("Collection", id))
}

// ─── Overview ────────────────────────────────────────────────

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Vec<SnapshotView>>> {
    let shard = ShardKey::new(auth.account_id);
    let snapshots = state
        .db
        .recent_snapshots(&shard, DASHBOARD_SNAPSHOTS)
        .await?;
    Ok(Json(snapshots.iter().map(SnapshotView::from).collect()))
}

async fn habits(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
) -> Result<Json<Vec<CollectionView>>> {
    let shard = ShardKey::new(auth.account_id);
    let collections = state
        .db
        .collections_with_flavor(&shard, Flavor::Habit)
        .await?;
    let views = try_join_all(
        collections
            .iter()
            .map(|c| collection_view(&state, &shard, c)),
    )
    .await?;
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

#[derive(Serialize)]
pub struct TimelineResponse {
    pub snapshots: BTreeMap<i64, SnapshotView>,
    /// Collections referenced by the snapshots; `snapshot_ids` lists only
    /// the snapshots within the requested range.
    pub collections: BTreeMap<i64, CollectionView>,
}

async fn timeline(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<TimelineResponse>> {
    let end = params.end.unwrap_or_else(unix_now_f64);
    let start = params.start.unwrap_or(end - DEFAULT_TIMELINE_SECS);
    if !start.is_finite() || !end.is_finite() || start > end {
        return Err(AppError::BadRequest("Invalid time range".to_string()));
    }

    let shard = ShardKey::new(auth.account_id);
    let snapshots = state.db.snapshots_between(&shard, start, end).await?;

    let collection_ids: Vec<i64> = snapshots
        .iter()
        .filter_map(|s| s.collection_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let collections = state.db.get_collections(&shard, &collection_ids).await?;

    let collections = collections
        .iter()
        .map(|c| {
            let ids = snapshots
                .iter()
                .filter(|s| s.collection_id == Some(c.id))
                .map(|s| s.id)
                .collect();
            (c.id, CollectionView::new(c, ids))
        })
        .collect();

    tracing::debug!(
        account_id = auth.account_id,
        count = snapshots.len(),
        "Timeline loaded"
    );

    Ok(Json(TimelineResponse {
        snapshots: snapshots
            .iter()
            .map(|s| (s.id, SnapshotView::from(s)))
            .collect(),
        collections,
    }))
}

// ─── Snapshots ───────────────────────────────────────────────

/// Create a snapshot. A `flavor` starts a new collection around it.
async fn create_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SnapshotView>)> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    let demographics = load_demographics(&state, auth.account_id).await?;
    let now = unix_now_f64();

    let mut snapshot = Snapshot::new(ids::record_id()?, now);
    snapshot.update_from(&data, &demographics)?;

    let flavor = data
        .get("flavor")
        .and_then(Value::as_str)
        .and_then(Flavor::parse);
    if let Some(flavor) = flavor {
        let collection = Collection::new(ids::record_id()?, now, Some(flavor));
        save_collection(&state, &shard, &collection, &[]).await?;
        snapshot.collection_id = Some(collection.id);
    } else {
        link_collection(&state, &shard, &mut snapshot, &data).await?;
    }

    state.db.set_snapshot(&shard, &snapshot).await?;
    tracing::debug!(account_id = auth.account_id, snapshot_id = snapshot.id, "Snapshot created");

    Ok((StatusCode::CREATED, Json(SnapshotView::from(&snapshot))))
}

async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<Json<SnapshotView>> {
    let shard = ShardKey::new(auth.account_id);
    let snapshot = load_snapshot(&state, &shard, id).await?;
    Ok(Json(SnapshotView::from(&snapshot)))
}

async fn update_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<SnapshotView>> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    let mut snapshot = load_snapshot(&state, &shard, id).await?;
    let demographics = load_demographics(&state, auth.account_id).await?;

    snapshot.update_from(&data, &demographics)?;
    link_collection(&state, &shard, &mut snapshot, &data).await?;
    state.db.set_snapshot(&shard, &snapshot).await?;

    Ok(Json(SnapshotView::from(&snapshot)))
}

async fn delete_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let shard = ShardKey::new(auth.account_id);
    load_snapshot(&state, &shard, id).await?;
    state.db.delete_snapshot(&shard, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Collections ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: CollectionView,
    pub snapshots: Vec<SnapshotView>,
}

async fn create_collection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CollectionView>)> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);

    let mut collection = Collection::new(ids::record_id()?, unix_now_f64(), None);
    let added = collection.update_from(&data)?;
    save_collection(&state, &shard, &collection, &added).await?;

    Ok((
        StatusCode::CREATED,
        Json(CollectionView::new(&collection, Vec::new())),
    ))
}

async fn get_collection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<Json<CollectionDetail>> {
    let shard = ShardKey::new(auth.account_id);
    let collection = load_collection(&state, &shard, id).await?;
    let snapshots = state.db.snapshots_in_collection(&shard, id).await?;

    Ok(Json(CollectionDetail {
        collection: CollectionView::new(&collection, snapshots.iter().map(|s| s.id).collect()),
        snapshots: snapshots.iter().map(SnapshotView::from).collect(),
    }))
}

async fn update_collection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<CollectionView>> {
    let data = json_object(body)?;
    let shard = ShardKey::new(auth.account_id);
    let mut collection = load_collection(&state, &shard, id).await?;

    let added = collection.update_from(&data)?;
    save_collection(&state, &shard, &collection, &added).await?;

    Ok(Json(collection_view(&state, &shard, &collection).await?))
}

async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthAccount>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let shard = ShardKey::new(auth.account_id);
    load_collection(&state, &shard, id).await?;
    state.db.delete_collection(&shard, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
