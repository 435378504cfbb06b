// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Point-in-time observations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::services::attributes::{self, AttributeSchema, CompressedJson};
use crate::services::fields::{below, positive, valid_timezone, within, FieldUpdater};
use crate::services::metrics::{self, Demographics};
use crate::time_utils::format_local_rfc3339;

/// Longest free-text note we keep.
pub const MAX_NOTE_CHARS: usize = 10_000;

/// Keys handled by the typed updater or the VO2-max triggers. Everything
/// else in an update goes to the sparse bag.
const CONSUMED_KEYS: &[&str] = &[
    "id",
    "utc",
    "tz",
    "lat",
    "lng",
    "note",
    "collection_id",
    "flavor",
    "height_cm",
    "weight_kg",
    "body_temp_degc",
    "heart_rate_bpm",
    "blood_pressure_mmhg",
    "blood_oxygen_spo2_pct",
    "vo2_max_ml_kg_min",
    "glucose_mmol_l",
    "lactate_mmol_l",
    "happy",
    "sad",
    "angry",
    "afraid",
    "mood",
    "resting_heart_rate_bpm",
    "walk_time_min",
    "walk_heart_rate_bpm",
];

/// A timestamped observation. Stored in `{shard}/snapshots/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    /// Unix seconds
    pub utc: f64,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub collection_id: Option<i64>,

    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub body_temp_degc: Option<f64>,
    #[serde(default)]
    pub heart_rate_bpm: Option<f64>,
    /// `1000 * systolic + diastolic`
    #[serde(default)]
    pub blood_pressure_mmhg: Option<f64>,
    #[serde(default)]
    pub blood_oxygen_spo2_pct: Option<f64>,
    #[serde(default)]
    pub vo2_max_ml_kg_min: Option<f64>,
    #[serde(default)]
    pub glucose_mmol_l: Option<f64>,
    #[serde(default)]
    pub lactate_mmol_l: Option<f64>,

    #[serde(default)]
    pub happy: Option<f64>,
    #[serde(default)]
    pub sad: Option<f64>,
    #[serde(default)]
    pub angry: Option<f64>,
    #[serde(default)]
    pub afraid: Option<f64>,
    #[serde(default)]
    pub mood: Option<f64>,

    #[serde(default)]
    pub kv: CompressedJson,
}

impl AttributeSchema for Snapshot {
    const STRING_KEYS: &'static [&'static str] = &[
        "gps_lats",
        "gps_lngs",
        "gps_alts",
        "gps_times",
        "rr_intervals",
        "step_intervals",
    ];
}

impl Snapshot {
    pub fn new(id: i64, utc: f64) -> Self {
        Self {
            id,
            utc,
            ..Self::default()
        }
    }

    /// Apply a partial update.
    ///
    /// `collection_id` is not handled here: the caller must check that the
    /// collection exists first.
    pub fn update_from(
        &mut self,
        data: &Map<String, Value>,
        demographics: &Demographics,
    ) -> Result<(), AppError> {
        let fields = FieldUpdater::new(data);

        if let Some(utc) = fields.float("utc", positive)? {
            self.utc = utc;
        }
        fields.update_string(&mut self.tz, "tz", valid_timezone)?;
        fields.update_f64(&mut self.lat, "lat", within(-90.0, 90.0))?;
        fields.update_f64(&mut self.lng, "lng", within(-180.0, 180.0))?;
        fields.update_string(&mut self.note, "note", |n| {
            n.chars().count() <= MAX_NOTE_CHARS
        })?;

        fields.update_f64(&mut self.height_cm, "height_cm", below(400.0))?;
        fields.update_f64(&mut self.weight_kg, "weight_kg", below(1000.0))?;
        fields.update_f64(&mut self.body_temp_degc, "body_temp_degc", below(100.0))?;
        fields.update_f64(&mut self.heart_rate_bpm, "heart_rate_bpm", below(1000.0))?;
        fields.update_f64(
            &mut self.blood_pressure_mmhg,
            "blood_pressure_mmhg",
            below(1_000_000.0),
        )?;
        fields.update_f64(
            &mut self.blood_oxygen_spo2_pct,
            "blood_oxygen_spo2_pct",
            |v| v > 0.0 && v <= 100.0,
        )?;
        fields.update_f64(&mut self.vo2_max_ml_kg_min, "vo2_max_ml_kg_min", below(1000.0))?;
        fields.update_f64(&mut self.glucose_mmol_l, "glucose_mmol_l", positive)?;
        fields.update_f64(&mut self.lactate_mmol_l, "lactate_mmol_l", positive)?;

        fields.update_f64(&mut self.happy, "happy", within(0.0, 1.0))?;
        fields.update_f64(&mut self.sad, "sad", within(0.0, 1.0))?;
        fields.update_f64(&mut self.angry, "angry", within(0.0, 1.0))?;
        fields.update_f64(&mut self.afraid, "afraid", within(0.0, 1.0))?;
        fields.update_f64(&mut self.mood, "mood", within(-1.0, 1.0))?;

        // The walk test runs last so its estimate wins.
        if let Some(resting) = fields.float("resting_heart_rate_bpm", below(1000.0))? {
            if let Some(vo2) =
                metrics::vo2_max_from_resting_hr(demographics.max_heart_rate_bpm(), Some(resting))
            {
                self.vo2_max_ml_kg_min = Some(vo2);
            }
        }
        if fields.contains("walk_time_min") && fields.contains("walk_heart_rate_bpm") {
            let walk_time = fields.float("walk_time_min", metrics::walk_time_in_range)?;
            let walk_hr = fields.float("walk_heart_rate_bpm", metrics::heart_rate_in_range)?;
            if let Some(vo2) = demographics.walk_test(self.weight_kg, walk_time, walk_hr) {
                self.vo2_max_ml_kg_min = Some(vo2);
            }
        }

        let rest: Map<String, Value> = data
            .iter()
            .filter(|(key, _)| !CONSUMED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.kv = attributes::merge_for::<Snapshot>(&self.kv, &rest)?;
        Ok(())
    }

    /// BMI when both height and weight are on this snapshot.
    pub fn bmi(&self) -> Option<f64> {
        metrics::bmi(self.weight_kg, self.height_cm).ok()
    }
}

/// JSON projection of a snapshot.
#[derive(Debug, Serialize)]
pub struct SnapshotView {
    pub id: i64,
    pub utc: f64,
    pub tz: Option<String>,
    pub local_time: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub note: Option<String>,
    pub collection_id: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub bmi: Option<f64>,
    pub body_temp_degc: Option<f64>,
    pub heart_rate_bpm: Option<f64>,
    pub blood_pressure_mmhg: Option<f64>,
    pub blood_oxygen_spo2_pct: Option<f64>,
    pub vo2_max_ml_kg_min: Option<f64>,
    pub glucose_mmol_l: Option<f64>,
    pub lactate_mmol_l: Option<f64>,
    pub happy: Option<f64>,
    pub sad: Option<f64>,
    pub angry: Option<f64>,
    pub afraid: Option<f64>,
    pub mood: Option<f64>,
    pub kv: Map<String, Value>,
}

impl From<&Snapshot> for SnapshotView {
    fn from(s: &Snapshot) -> Self {
        Self {
            id: s.id,
            utc: s.utc,
            tz: s.tz.clone(),
            local_time: s.tz.as_deref().and_then(|tz| format_local_rfc3339(s.utc, tz)),
            lat: s.lat,
            lng: s.lng,
            note: s.note.clone(),
            collection_id: s.collection_id,
            height_cm: s.height_cm,
            weight_kg: s.weight_kg,
            bmi: s.bmi(),
            body_temp_degc: s.body_temp_degc,
            heart_rate_bpm: s.heart_rate_bpm,
            blood_pressure_mmhg: s.blood_pressure_mmhg,
            blood_oxygen_spo2_pct: s.blood_oxygen_spo2_pct,
            vo2_max_ml_kg_min: s.vo2_max_ml_kg_min,
            glucose_mmol_l: s.glucose_mmol_l,
            lactate_mmol_l: s.lactate_mmol_l,
            happy: s.happy,
            sad: s.sad,
            angry: s.angry,
            afraid: s.afraid,
            mood: s.mood,
            kv: attributes::to_json(&s.kv),
        }
    }
}
