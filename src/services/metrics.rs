// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Derived physiological metrics.
//!
//! All coefficients are published empirical constants and are reproduced
//! exactly:
//! - max heart rate: mean of `220 - age`, `217 - 0.85 age`,
//!   `206.9 - 0.67 age`, plus `202 - 0.55 age` (male) or
//!   `216 - 1.09 age` (female) when sex is known
//! - VO2-max, heart-rate ratio method: `15.3 * HRmax / HRrest`
//! - VO2-max, Rockport one-mile walk test

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Biological sex as used by the sex-specific formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Parse `"male"`/`"female"` (also `m`/`f`), case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Sex::Male),
            "female" | "f" => Some(Sex::Female),
            _ => None,
        }
    }

    fn is_male(self) -> f64 {
        match self {
            Sex::Male => 1.0,
            Sex::Female => 0.0,
        }
    }
}

/// Errors from metric computations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("Division undefined: {0} is zero or absent")]
    DivisionUndefined(&'static str),

    #[error("Missing input: {0}")]
    MissingInput(&'static str),
}

/// Whole years elapsed since an ISO `YYYY-MM-DD` birthday.
///
/// Returns `None` for an absent, unparsable or future birthday.
pub fn age_years(birthday: Option<&str>, as_of: NaiveDate) -> Option<u32> {
    let born = NaiveDate::parse_from_str(birthday?.trim(), "%Y-%m-%d").ok()?;
    let mut years = as_of.year() - born.year();
    if (as_of.month(), as_of.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Age-adjusted maximum heart rate estimate in beats per minute.
pub fn max_heart_rate_bpm(age_years: Option<u32>, sex: Option<Sex>) -> Option<f64> {
    let age = f64::from(age_years?);
    let mut models = vec![220.0 - age, 217.0 - 0.85 * age, 206.9 - 0.67 * age];
    match sex {
        Some(Sex::Male) => models.push(202.0 - 0.55 * age),
        Some(Sex::Female) => models.push(216.0 - 1.09 * age),
        None => {}
    }
    Some(models.iter().sum::<f64>() / models.len() as f64)
}

/// Body mass index, `weight_kg / (height_cm / 100)^2`.
pub fn bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Result<f64, MetricError> {
    let weight_kg = weight_kg.ok_or(MetricError::MissingInput("weight_kg"))?;
    let height_m = match height_cm {
        Some(h) if h != 0.0 => h / 100.0,
        _ => return Err(MetricError::DivisionUndefined("height_cm")),
    };
    Ok(weight_kg / (height_m * height_m))
}

/// VO2-max from the ratio of maximal to resting heart rate.
pub fn vo2_max_from_resting_hr(max_hr_bpm: Option<f64>, resting_hr_bpm: Option<f64>) -> Option<f64> {
    let max_hr = max_hr_bpm?;
    let resting = resting_hr_bpm.filter(|hr| *hr > 0.0)?;
    Some(15.3 * max_hr / resting)
}

/// VO2-max (ml/kg/min) from the Rockport one-mile walk test.
pub fn vo2_max_from_walk_test(
    sex: Sex,
    age_years: f64,
    weight_kg: f64,
    walk_time_min: f64,
    walk_heart_rate_bpm: f64,
) -> f64 {
    132.8530 + 6.3150 * sex.is_male()
        - 0.3877 * age_years
        - 0.1695 * weight_kg
        - 3.2649 * walk_time_min
        - 0.1565 * walk_heart_rate_bpm
}

/// Valid walk duration, minutes (exclusive bounds).
pub fn walk_time_in_range(minutes: f64) -> bool {
    minutes > 0.0 && minutes < 100.0
}

/// Valid heart rate, bpm (exclusive bounds).
pub fn heart_rate_in_range(bpm: f64) -> bool {
    bpm > 0.0 && bpm < 1000.0
}

/// Inputs the walk test needs beyond the measured walk itself.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Demographics {
    pub age_years: Option<u32>,
    pub sex: Option<Sex>,
}

impl Demographics {
    pub fn max_heart_rate_bpm(&self) -> Option<f64> {
        max_heart_rate_bpm(self.age_years, self.sex)
    }

    /// Rockport estimate when every input is present and in range.
    pub fn walk_test(
        &self,
        weight_kg: Option<f64>,
        walk_time_min: Option<f64>,
        walk_heart_rate_bpm: Option<f64>,
    ) -> Option<f64> {
        let walk_time_min = walk_time_min.filter(|m| walk_time_in_range(*m))?;
        let walk_heart_rate_bpm = walk_heart_rate_bpm.filter(|hr| heart_rate_in_range(*hr))?;
        Some(vo2_max_from_walk_test(
            self.sex?,
            f64::from(self.age_years?),
            weight_kg?,
            walk_time_min,
            walk_heart_rate_bpm,
        ))
    }
}
