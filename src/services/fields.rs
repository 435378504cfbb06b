// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Validated field updates for typed entity columns.
//!
//! Each declared field is handled independently:
//! 1. absent from the request: left alone
//! 2. present but not coercible to the column type: the whole request fails
//!    with `BadRequest`
//! 3. coercible but outside the column's valid range: silently skipped
//! 4. otherwise assigned
//!
//! An explicit `null` clears a nullable column.

use serde_json::{Map, Value};

use crate::error::AppError;

/// Outcome of reading one declared field from a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange<T> {
    /// Assign a validated value.
    Set(T),
    /// The client sent `null`.
    Clear,
}

/// Coerce a JSON value to a float.
///
/// Numbers and numeric strings are accepted. Booleans, arrays, objects and
/// non-finite results are not.
pub fn parse_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerce a JSON value to an integer, truncating finite floats.
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Coerce a JSON scalar to a string.
pub fn parse_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads declared fields out of a client's partial update.
pub struct FieldUpdater<'a> {
    data: &'a Map<String, Value>,
}

impl<'a> FieldUpdater<'a> {
    pub fn new(data: &'a Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Read one field with the given parser and range predicate.
    pub fn read<T, P, V>(
        &self,
        name: &str,
        parse: P,
        valid: V,
    ) -> Result<Option<FieldChange<T>>, AppError>
    where
        P: Fn(&Value) -> Option<T>,
        V: Fn(&T) -> bool,
        T: std::fmt::Debug,
    {
        let raw = match self.data.get(name) {
            None => return Ok(None),
            Some(Value::Null) => return Ok(Some(FieldChange::Clear)),
            Some(raw) => raw,
        };

        let parsed = parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Field '{}' has an invalid type or format", name))
        })?;

        if !valid(&parsed) {
            tracing::debug!(field = name, value = ?parsed, "Dropping out-of-range field");
            return Ok(None);
        }
        Ok(Some(FieldChange::Set(parsed)))
    }

    /// Read a float that must satisfy `valid`; `null` is ignored.
    pub fn float(&self, name: &str, valid: impl Fn(f64) -> bool) -> Result<Option<f64>, AppError> {
        Ok(match self.read(name, parse_float, |v| valid(*v))? {
            Some(FieldChange::Set(v)) => Some(v),
            _ => None,
        })
    }

    /// Assign a nullable float column in place.
    pub fn update_f64(
        &self,
        slot: &mut Option<f64>,
        name: &str,
        valid: impl Fn(f64) -> bool,
    ) -> Result<(), AppError> {
        match self.read(name, parse_float, |v| valid(*v))? {
            Some(FieldChange::Set(v)) => *slot = Some(v),
            Some(FieldChange::Clear) => *slot = None,
            None => {}
        }
        Ok(())
    }

    /// Assign a nullable integer column in place.
    pub fn update_i64(
        &self,
        slot: &mut Option<i64>,
        name: &str,
        valid: impl Fn(i64) -> bool,
    ) -> Result<(), AppError> {
        match self.read(name, parse_int, |v| valid(*v))? {
            Some(FieldChange::Set(v)) => *slot = Some(v),
            Some(FieldChange::Clear) => *slot = None,
            None => {}
        }
        Ok(())
    }

    /// Assign a nullable string column in place.
    pub fn update_string(
        &self,
        slot: &mut Option<String>,
        name: &str,
        valid: impl Fn(&str) -> bool,
    ) -> Result<(), AppError> {
        match self.read(name, parse_string, |v: &String| valid(v.as_str()))? {
            Some(FieldChange::Set(v)) => *slot = Some(v),
            Some(FieldChange::Clear) => *slot = None,
            None => {}
        }
        Ok(())
    }
}

// ─── Range predicates ────────────────────────────────────────

pub fn positive(v: f64) -> bool {
    v > 0.0
}

pub fn positive_int(v: i64) -> bool {
    v > 0
}

/// Open interval `(0, max)`.
pub fn below(max: f64) -> impl Fn(f64) -> bool {
    move |v| v > 0.0 && v < max
}

/// Closed interval `[min, max]`.
pub fn within(min: f64, max: f64) -> impl Fn(f64) -> bool {
    move |v| (min..=max).contains(&v)
}

/// A time zone name like `America/Los_Angeles`.
///
/// Must start with two word segments separated by `/`, be shorter than 80
/// characters and resolve in the tz database.
pub fn valid_timezone(tz: &str) -> bool {
    if tz.len() >= 80 {
        return false;
    }
    let mut parts = tz.splitn(2, '/');
    let area = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("");
    let word = |c: char| c.is_alphanumeric() || c == '_';
    let has_shape = !area.is_empty()
        && area.chars().all(word)
        && rest.chars().next().is_some_and(word);
    has_shape && tz.parse::<chrono_tz::Tz>().is_ok()
}

/// Password policy: 8 to 64 characters with at least one word character
/// and at least one non-word character.
pub fn valid_password(password: &str) -> bool {
    let len = password.chars().count();
    let word = |c: char| c.is_alphanumeric() || c == '_';
    (8..=64).contains(&len) && password.chars().any(word) && password.chars().any(|c| !word(c))
}
