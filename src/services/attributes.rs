// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sparse attribute bags stored as zlib-compressed JSON.
//!
//! Entities carry a flat `key -> value` bag on top of their typed columns.
//! Clients may set any boolean or numeric key, but string values are only
//! accepted for keys on the entity type's allow-list. A `null` removes the
//! key. Decoding is total: a corrupt or missing blob reads as an empty bag.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::error::AppError;

/// One value in an attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Decoded attribute bag. Ordered so encoding is deterministic.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Entity types that expose a sparse attribute bag.
pub trait AttributeSchema {
    /// Keys that may hold string values. Numeric and boolean keys are never restricted.
    const STRING_KEYS: &'static [&'static str];
}

/// Opaque compressed JSON column.
///
/// Serialized as base64 so it can live in any document store field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedJson(Vec<u8>);

impl CompressedJson {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CompressedJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for CompressedJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        // An undecodable column is kept as raw bytes; readers treat it as empty.
        Ok(Self(
            raw.map(|s| BASE64.decode(s.as_bytes()).unwrap_or_else(|_| s.into_bytes()))
                .unwrap_or_default(),
        ))
    }
}

/// Errors from encoding an attribute bag.
#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    #[error("Failed to serialize attributes: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to compress attributes: {0}")]
    Compress(#[from] std::io::Error),
}

impl From<AttributeError> for AppError {
    fn from(err: AttributeError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

/// Serialize any value to JSON and compress it.
pub fn compress_json<T: Serialize + ?Sized>(value: &T) -> Result<CompressedJson, AttributeError> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(CompressedJson(encoder.finish()?))
}

/// Decompress and parse a blob, falling back to `T::default()` on any failure.
pub fn decompress_json<T: DeserializeOwned + Default>(blob: &CompressedJson) -> T {
    let mut json = Vec::new();
    if ZlibDecoder::new(blob.as_bytes())
        .read_to_end(&mut json)
        .is_err()
    {
        return T::default();
    }
    serde_json::from_slice(&json).unwrap_or_default()
}

/// Decode a blob into an attribute bag. Never fails.
pub fn decode(blob: &CompressedJson) -> Attributes {
    decompress_json(blob)
}

/// Encode an attribute bag into a blob.
pub fn encode(attrs: &Attributes) -> Result<CompressedJson, AttributeError> {
    compress_json(attrs)
}

/// Apply a partial update to a blob.
///
/// An empty update returns the original blob byte-for-byte.
pub fn merge(
    blob: &CompressedJson,
    updates: &Map<String, Value>,
    allowed_string_keys: &[&str],
) -> Result<CompressedJson, AttributeError> {
    if updates.is_empty() {
        return Ok(blob.clone());
    }

    let mut current = decode(blob);
    for (key, value) in updates {
        match value {
            Value::Null => {
                current.remove(key);
            }
            Value::Bool(b) => {
                current.insert(key.clone(), AttrValue::Bool(*b));
            }
            Value::Number(n) => {
                let attr = match n.as_i64() {
                    Some(i) => AttrValue::Int(i),
                    None => AttrValue::Float(n.as_f64().unwrap_or(f64::NAN)),
                };
                current.insert(key.clone(), attr);
            }
            Value::String(s) if allowed_string_keys.contains(&key.as_str()) => {
                current.insert(key.clone(), AttrValue::Text(s.clone()));
            }
            Value::String(_) => {
                tracing::debug!(key = %key, "Ignoring string attribute outside allow-list");
            }
            Value::Array(_) | Value::Object(_) => {
                tracing::debug!(key = %key, "Ignoring non-scalar attribute");
            }
        }
    }
    encode(&current)
}

/// Merge for an entity type, using its declared allow-list.
pub fn merge_for<S: AttributeSchema>(
    blob: &CompressedJson,
    updates: &Map<String, Value>,
) -> Result<CompressedJson, AttributeError> {
    merge(blob, updates, S::STRING_KEYS)
}

/// Project a bag into a JSON object for API responses.
pub fn to_json(blob: &CompressedJson) -> Map<String, Value> {
    decode(blob)
        .into_iter()
        .map(|(key, value)| {
            let json = match value {
                AttrValue::Bool(b) => Value::Bool(b),
                AttrValue::Int(i) => Value::from(i),
                AttrValue::Float(f) => Value::from(f),
                AttrValue::Text(s) => Value::String(s),
            };
            (key, json)
        })
        .collect()
}
