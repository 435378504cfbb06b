// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod account;
pub mod collection;
pub mod exercise;
pub mod snapshot;
pub mod tag;
pub mod workout;

pub use account::{Account, Email, Key, Password, Profile};
pub use collection::{Collection, Flavor};
pub use exercise::Exercise;
pub use snapshot::Snapshot;
pub use tag::{Tag, TagSet};
pub use workout::{Effort, Set, Workout};
