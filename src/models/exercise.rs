// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise catalog entries.

use serde::{Deserialize, Serialize};

use super::tag::TagSet;

/// One catalog entry, as read from the exercise file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseDef {
    pub name: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub howto: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A named, tagged exercise referenced by sets.
#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub name: String,
    pub about: Option<String>,
    pub howto: Option<String>,
    pub tags: TagSet,
}

impl From<ExerciseDef> for Exercise {
    fn from(def: ExerciseDef) -> Self {
        Self {
            name: def.name.trim().to_string(),
            about: def.about,
            howto: def.howto,
            tags: def.tags.iter().collect(),
        }
    }
}
