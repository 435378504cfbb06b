// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vitals-Tracker: a personal quantified-self tracker
//!
//! This crate provides the backend API for recording body measurements,
//! habits and workouts, and for deriving health metrics from them.

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ExerciseCatalog, LoginLimiter};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub exercises: ExerciseCatalog,
    pub login_limiter: LoginLimiter,
}
