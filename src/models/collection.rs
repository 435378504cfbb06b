// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tagged groupings of snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tag::TagSet;
use crate::error::AppError;
use crate::services::attributes::{self, AttributeSchema, CompressedJson};

/// What kind of grouping a collection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Habit,
    Sleep,
    Workout,
}

impl Flavor {
    /// Case-insensitive parse; unknown flavors are `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "habit" => Some(Flavor::Habit),
            "sleep" => Some(Flavor::Sleep),
            "workout" => Some(Flavor::Workout),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::Habit => "habit",
            Flavor::Sleep => "sleep",
            Flavor::Workout => "workout",
        }
    }
}

/// Stored in `{shard}/collections/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub flavor: Option<Flavor>,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub kv: CompressedJson,
}

impl AttributeSchema for Collection {
    const STRING_KEYS: &'static [&'static str] = &["goals"];
}

impl Collection {
    pub fn new(id: i64, created_utc: f64, flavor: Option<Flavor>) -> Self {
        Self {
            id,
            created_utc,
            flavor,
            tags: TagSet::new(),
            kv: CompressedJson::default(),
        }
    }

    /// Apply a partial update.
    ///
    /// Returns tag names newly attached, which need global tag records.
    pub fn update_from(&mut self, data: &Map<String, Value>) -> Result<Vec<String>, AppError> {
        if let Some(flavor) = data.get("flavor").and_then(Value::as_str).and_then(Flavor::parse) {
            self.flavor = Some(flavor);
        }

        let added = match data.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => self.tags.apply(tag_instructions(value)?),
        };

        let rest: Map<String, Value> = data
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "id" | "flavor" | "tags"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.kv = attributes::merge_for::<Collection>(&self.kv, &rest)?;
        Ok(added)
    }
}

/// Tag instructions are a list of strings, or a single string.
pub fn tag_instructions(value: &Value) -> Result<Vec<String>, AppError> {
    let invalid = || AppError::BadRequest("'tags' must be a list of strings".to_string());
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

/// JSON projection of a collection.
#[derive(Debug, Serialize)]
pub struct CollectionView {
    pub id: i64,
    pub created_utc: f64,
    pub flavor: Option<Flavor>,
    pub tags: TagSet,
    pub kv: Map<String, Value>,
    pub snapshot_ids: Vec<i64>,
}

impl CollectionView {
    pub fn new(collection: &Collection, snapshot_ids: Vec<i64>) -> Self {
        Self {
            id: collection.id,
            created_utc: collection.created_utc,
            flavor: collection.flavor,
            tags: collection.tags.clone(),
            kv: attributes::to_json(&collection.kv),
            snapshot_ids,
        }
    }
}
