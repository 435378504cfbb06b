// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod attributes;
pub mod exercises;
pub mod fields;
pub mod keys;
pub mod limiter;
pub mod metrics;
pub mod password;
pub mod track;

pub use exercises::{CatalogError, ExerciseCatalog};
pub use limiter::LoginLimiter;
