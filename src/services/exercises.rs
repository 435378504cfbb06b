// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise catalog loading and lookup.

use crate::models::exercise::{Exercise, ExerciseDef};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// In-memory exercise catalog, loaded once at startup.
#[derive(Debug, Default, Clone)]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
    by_name: HashMap<String, usize>,
}

impl ExerciseCatalog {
    /// Load the catalog from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load the catalog from a JSON array of exercise definitions.
    pub fn load_from_json(json_data: &str) -> Result<Self, CatalogError> {
        let defs: Vec<ExerciseDef> =
            serde_json::from_str(json_data).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let mut catalog = Self::default();
        for def in defs {
            let exercise = Exercise::from(def);
            if exercise.name.is_empty() {
                return Err(CatalogError::MissingName);
            }
            let key = exercise.name.to_lowercase();
            if catalog.by_name.contains_key(&key) {
                return Err(CatalogError::Duplicate(exercise.name));
            }
            catalog.by_name.insert(key, catalog.exercises.len());
            catalog.exercises.push(exercise);
        }

        tracing::info!(count = catalog.exercises.len(), "Loaded exercise catalog");
        Ok(catalog)
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Case-insensitive lookup by name.
    pub fn find(&self, name: &str) -> Option<&Exercise> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.exercises[i])
    }
}

/// Errors from loading the exercise catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse exercise catalog: {0}")]
    ParseError(String),

    #[error("Exercise without a name")]
    MissingName,

    #[error("Duplicate exercise name: {0}")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {"name": "Back Squat", "about": "Barbell squat", "tags": ["Legs", "barbell"]},
        {"name": "Run", "tags": ["cardio"]}
    ]"#;

    #[test]
    fn test_load_and_find() {
        let catalog = ExerciseCatalog::load_from_json(CATALOG).unwrap();
        assert_eq!(catalog.exercises().len(), 2);

        let squat = catalog.find("back squat").unwrap();
        assert_eq!(squat.name, "Back Squat");
        assert!(squat.tags.contains("legs"));
        assert!(catalog.find("deadlift").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = ExerciseCatalog::load_from_json(r#"[{"name": "Run"}, {"name": "run"}]"#)
            .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(_)));
    }

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = ExerciseCatalog::load_from_file("data/exercises.json").unwrap();
        assert!(!catalog.exercises().is_empty());
    }
}
