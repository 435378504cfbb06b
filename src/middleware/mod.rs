// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, CSRF, security headers).

pub mod auth;
pub mod csrf;
pub mod security;

pub use auth::{require_auth, AuthAccount};
pub use csrf::require_csrf;
