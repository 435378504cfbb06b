// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workouts and the exercise sets performed in them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::collection::CollectionView;
use crate::error::AppError;
use crate::services::attributes::{self, CompressedJson};
use crate::services::fields::{parse_float, positive, positive_int, FieldUpdater};
use crate::services::track;

/// A workout extends the collection with the same id.
///
/// Stored in `{shard}/workouts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub created_utc: f64,
    /// Arbitrary client JSON, e.g. a list of target sets.
    #[serde(default)]
    pub goals: CompressedJson,
}

impl Workout {
    pub fn new(id: i64, created_utc: f64) -> Self {
        Self {
            id,
            created_utc,
            goals: CompressedJson::default(),
        }
    }

    /// Replace goals when the update carries them.
    pub fn update_from(&mut self, data: &Map<String, Value>) -> Result<(), AppError> {
        if let Some(goals) = data.get("goals") {
            self.goals = attributes::compress_json(goals)?;
        }
        Ok(())
    }

    pub fn goals_json(&self) -> Value {
        if self.goals.is_empty() {
            return Value::Null;
        }
        attributes::decompress_json::<Option<Value>>(&self.goals).unwrap_or(Value::Null)
    }
}

/// Measurements reported for a set, either planned or achieved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Effort {
    #[serde(default)]
    pub reps: Option<i64>,
    #[serde(default)]
    pub resistance: Option<f64>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub cadence_hz: Option<f64>,
    #[serde(default)]
    pub avg_power_w: Option<f64>,
}

impl Effort {
    /// Read the effort fields, with every key prefixed by `prefix`.
    fn update_from(&mut self, fields: &FieldUpdater<'_>, prefix: &str) -> Result<(), AppError> {
        let key = |name: &str| format!("{}{}", prefix, name);
        fields.update_i64(&mut self.reps, &key("reps"), positive_int)?;
        fields.update_f64(&mut self.resistance, &key("resistance"), positive)?;
        fields.update_f64(&mut self.distance_m, &key("distance_m"), positive)?;
        fields.update_f64(&mut self.cadence_hz, &key("cadence_hz"), positive)?;
        fields.update_f64(&mut self.avg_power_w, &key("avg_power_w"), positive)?;
        Ok(())
    }
}

/// One exercise performed within a workout. Stored in `{shard}/sets/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Set {
    pub id: i64,
    pub workout_id: i64,
    /// Catalog exercise name
    pub exercise: String,
    #[serde(default)]
    pub start_utc: Option<i64>,
    #[serde(default)]
    pub end_utc: Option<i64>,
    #[serde(default)]
    pub target: Effort,
    #[serde(default)]
    pub actual: Effort,
    /// Heart-rate R-R intervals in milliseconds
    #[serde(default)]
    pub rr_intervals_ms: Option<CompressedJson>,
    /// Step intervals in milliseconds
    #[serde(default)]
    pub step_intervals_ms: Option<CompressedJson>,
    /// Encoded polyline, precision 5
    #[serde(default)]
    pub gps_polyline: Option<String>,
}

impl Set {
    pub fn new(id: i64, workout_id: i64, exercise: String) -> Self {
        Self {
            id,
            workout_id,
            exercise,
            start_utc: None,
            end_utc: None,
            target: Effort::default(),
            actual: Effort::default(),
            rr_intervals_ms: None,
            step_intervals_ms: None,
            gps_polyline: None,
        }
    }

    /// Apply a partial update. Actual values use bare keys, planned values
    /// use `target_` keys.
    pub fn update_from(&mut self, data: &Map<String, Value>) -> Result<(), AppError> {
        let fields = FieldUpdater::new(data);
        fields.update_i64(&mut self.start_utc, "start_utc", positive_int)?;
        fields.update_i64(&mut self.end_utc, "end_utc", positive_int)?;
        self.actual.update_from(&fields, "")?;
        self.target.update_from(&fields, "target_")?;

        update_intervals(&mut self.rr_intervals_ms, data, "rr_intervals_ms")?;
        update_intervals(&mut self.step_intervals_ms, data, "step_intervals_ms")?;

        match data.get("gps_polyline") {
            None => {}
            Some(Value::Null) => self.gps_polyline = None,
            Some(Value::String(encoded)) => {
                let line = track::decode_track(encoded)
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if line.0.len() >= 2 && !data.contains_key("distance_m") {
                    let length = track::track_length_m(&line);
                    if length > 0.0 {
                        self.actual.distance_m = Some(length);
                    }
                }
                self.gps_polyline = Some(encoded.clone());
            }
            Some(_) => {
                return Err(AppError::BadRequest(
                    "'gps_polyline' must be a string".to_string(),
                ))
            }
        }
        Ok(())
    }

    pub fn rr_intervals(&self) -> Vec<f64> {
        self.rr_intervals_ms
            .as_ref()
            .map(attributes::decompress_json::<Vec<f64>>)
            .unwrap_or_default()
    }

    pub fn step_intervals(&self) -> Vec<f64> {
        self.step_intervals_ms
            .as_ref()
            .map(attributes::decompress_json::<Vec<f64>>)
            .unwrap_or_default()
    }
}

/// Store an interval series: an array of positive numbers.
///
/// A non-array is a client error; an array with a non-positive entry is skipped.
fn update_intervals(
    slot: &mut Option<CompressedJson>,
    data: &Map<String, Value>,
    name: &str,
) -> Result<(), AppError> {
    let items = match data.get(name) {
        None => return Ok(()),
        Some(Value::Null) => {
            *slot = None;
            return Ok(());
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(AppError::BadRequest(format!(
                "Field '{}' must be a list of numbers",
                name
            )))
        }
    };

    let values = items
        .iter()
        .map(|item| {
            parse_float(item).ok_or_else(|| {
                AppError::BadRequest(format!("Field '{}' must be a list of numbers", name))
            })
        })
        .collect::<Result<Vec<f64>, AppError>>()?;

    if values.iter().all(|v| *v > 0.0) {
        *slot = Some(attributes::compress_json(&values)?);
    } else {
        tracing::debug!(field = name, "Dropping interval series with non-positive entries");
    }
    Ok(())
}

// ─── API projections ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SetView {
    pub id: i64,
    pub workout_id: i64,
    pub exercise: String,
    pub start_utc: Option<i64>,
    pub end_utc: Option<i64>,
    pub target: Effort,
    pub actual: Effort,
    pub rr_intervals_ms: Vec<f64>,
    pub step_intervals_ms: Vec<f64>,
    pub gps_polyline: Option<String>,
}

impl From<&Set> for SetView {
    fn from(set: &Set) -> Self {
        Self {
            id: set.id,
            workout_id: set.workout_id,
            exercise: set.exercise.clone(),
            start_utc: set.start_utc,
            end_utc: set.end_utc,
            target: set.target.clone(),
            actual: set.actual.clone(),
            rr_intervals_ms: set.rr_intervals(),
            step_intervals_ms: set.step_intervals(),
            gps_polyline: set.gps_polyline.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkoutView {
    pub id: i64,
    pub created_utc: f64,
    pub goals: Value,
    pub collection: CollectionView,
    pub sets: Vec<SetView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_actual_and_target_efforts() {
        let mut set = Set::new(1, 2, "Back Squat".to_string());
        set.update_from(&data(json!({
            "reps": 5,
            "resistance": 100.0,
            "target_reps": 5,
            "target_resistance": 0,
            "end_utc": 1700000000
        })))
        .unwrap();
        assert_eq!(set.actual.reps, Some(5));
        assert_eq!(set.actual.resistance, Some(100.0));
        assert_eq!(set.target.reps, Some(5));
        assert_eq!(set.target.resistance, None);
        assert_eq!(set.end_utc, Some(1_700_000_000));
    }

    #[test]
    fn test_bad_number_is_client_error() {
        let mut set = Set::new(1, 2, "Run".to_string());
        assert!(set.update_from(&data(json!({"reps": "five"}))).is_err());
    }

    #[test]
    fn test_intervals() {
        let mut set = Set::new(1, 2, "Run".to_string());
        set.update_from(&data(json!({"rr_intervals_ms": [800, 810.5, "790"]})))
            .unwrap();
        assert_eq!(set.rr_intervals(), vec![800.0, 810.5, 790.0]);

        // A non-positive entry drops the whole series.
        set.update_from(&data(json!({"rr_intervals_ms": [800, 0]}))).unwrap();
        assert_eq!(set.rr_intervals(), vec![800.0, 810.5, 790.0]);

        assert!(set.update_from(&data(json!({"step_intervals_ms": 5}))).is_err());

        set.update_from(&data(json!({"rr_intervals_ms": null}))).unwrap();
        assert!(set.rr_intervals().is_empty());
    }

    #[test]
    fn test_track_sets_distance_unless_given() {
        // (38.5, -120.2) -> (40.7, -120.95) -> (43.252, -126.453)
        let polyline = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

        let mut set = Set::new(1, 2, "Run".to_string());
        set.update_from(&data(json!({"gps_polyline": polyline}))).unwrap();
        let derived = set.actual.distance_m.unwrap();
        assert!(derived > 500_000.0 && derived < 1_000_000.0, "got {}", derived);

        let mut set = Set::new(1, 2, "Run".to_string());
        set.update_from(&data(json!({"gps_polyline": polyline, "distance_m": 1234})))
            .unwrap();
        assert_eq!(set.actual.distance_m, Some(1234.0));

        assert!(set
            .update_from(&data(json!({"gps_polyline": "!!!!"})))
            .is_err());
    }

    #[test]
    fn test_workout_goals() {
        let mut workout = Workout::new(1, 0.0);
        assert_eq!(workout.goals_json(), Value::Null);
        workout
            .update_from(&data(json!({"goals": [{"exercise": "Run", "distance_m": 5000}]})))
            .unwrap();
        assert_eq!(workout.goals_json()[0]["exercise"], "Run");
    }
}
