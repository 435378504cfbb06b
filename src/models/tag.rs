// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Free-text tags and the tag instruction language.
//!
//! Owners (collections, exercises) hold a set of tag names. Clients edit it
//! with a list of instructions applied in order:
//! - `"-"` clears every tag
//! - `"-name"` removes `name`
//! - anything else adds it
//!
//! Instructions are trimmed and lower-cased first, so names compare
//! case-insensitively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Longest tag name we store.
pub const MAX_TAG_LEN: usize = 32;

/// Global tag record, shared by every owner that uses the name.
///
/// Stored in `tags/{urlencoded name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub created_utc: f64,
}

/// The tag names attached to one owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Apply tag instructions in order.
    ///
    /// Returns the names that were newly added, which may need a global
    /// `Tag` record.
    pub fn apply<I, S>(&mut self, instructions: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for instruction in instructions {
            let instruction = instruction.as_ref().trim().to_lowercase();
            if instruction == "-" {
                self.0.clear();
                added.clear();
            } else if let Some(name) = instruction.strip_prefix('-') {
                let name = name.trim();
                self.0.remove(name);
                added.retain(|n| n != name);
            } else if instruction.is_empty() || instruction.chars().count() > MAX_TAG_LEN {
                tracing::debug!(tag = %instruction, "Ignoring unusable tag name");
            } else if self.0.insert(instruction.clone()) {
                added.push(instruction);
            }
        }
        added
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        tags.apply(iter);
        tags
    }
}
