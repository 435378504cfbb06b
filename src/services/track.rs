// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS track handling for exercise sets.
//!
//! Tracks arrive as Google encoded polylines (precision 5, as produced by
//! most fitness devices) and are stored in that form.

use geo::{Distance, Haversine, LineString, Point};
use geojson::{Feature, Geometry, JsonObject};
use serde_json::Value;

/// Encoded polyline precision.
pub const POLYLINE_PRECISION: u32 = 5;

/// Decode an encoded polyline into a line of (lng, lat) coordinates.
pub fn decode_track(encoded: &str) -> Result<LineString<f64>, TrackError> {
    polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| TrackError::PolylineError(e.to_string()))
}

/// Encode a line of (lng, lat) coordinates.
pub fn encode_track(line: &LineString<f64>) -> Result<String, TrackError> {
    polyline::encode_coordinates(line.coords().copied(), POLYLINE_PRECISION)
        .map_err(|e| TrackError::PolylineError(e.to_string()))
}

/// Great-circle length of a track in meters.
pub fn track_length_m(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| Haversine.distance(Point::from(segment.start), Point::from(segment.end)))
        .sum()
}

/// Render a track as a GeoJSON feature.
pub fn track_feature(line: &LineString<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Properties attached to a set's track feature.
pub fn track_properties(set_id: i64, distance_m: f64, points: usize) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("set_id".to_string(), Value::from(set_id));
    props.insert("distance_m".to_string(), Value::from(distance_m));
    props.insert("points".to_string(), Value::from(points));
    props
}

/// Errors from track decoding.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Failed to decode polyline: {0}")]
    PolylineError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Google's reference polyline: (38.5, -120.2), (40.7, -120.95), (43.252, -126.453)
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn test_decode_reference_polyline() {
        let line = decode_track(REFERENCE).unwrap();
        let coords: Vec<_> = line.coords().collect();
        assert_eq!(coords.len(), 3);
        assert!((coords[0].y - 38.5).abs() < 1e-9);
        assert!((coords[0].x - -120.2).abs() < 1e-9);
        assert!((coords[2].y - 43.252).abs() < 1e-9);
    }

    #[test]
    fn test_encode_matches_reference() {
        let line = decode_track(REFERENCE).unwrap();
        assert_eq!(encode_track(&line).unwrap(), REFERENCE);
    }

    #[test]
    fn test_track_length() {
        // One degree of latitude is roughly 111.2 km.
        let line = LineString::from(vec![(0.0, 0.0), (0.0, 1.0)]);
        let length = track_length_m(&line);
        assert!((length - 111_195.0).abs() < 100.0, "got {}", length);

        let single = LineString::from(vec![(0.0, 0.0)]);
        assert_eq!(track_length_m(&single), 0.0);
    }

    #[test]
    fn test_invalid_polyline() {
        assert!(decode_track("!!!!").is_err());
    }

    #[test]
    fn test_feature_has_linestring_geometry() {
        let line = decode_track(REFERENCE).unwrap();
        let feature = track_feature(&line, track_properties(7, 1.5, 3));
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "LineString");
        assert_eq!(json["properties"]["set_id"], 7);
    }
}
