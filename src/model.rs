use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Raw current-weather observation, held as the parsed JSON document
/// exactly as the endpoint returned it.
///
/// Field access is deferred to the transform stage: a body that is
/// valid JSON but lacks a required field fails there with a
/// `Serialization` error naming the path, not at fetch time.
#[derive(Debug, Clone)]
pub struct WeatherReading {
    document: Value,
}

impl WeatherReading {
    /// Parse a response body. Fails with `MalformedResponse` when the
    /// body is not valid JSON; which fields the document carries is
    /// only checked by the accessors below.
    pub fn from_json(body: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(body).map_err(|e| {
            AppError::MalformedResponse(format!("response body is not valid JSON: {}", e))
        })?;
        Ok(Self { document })
    }

    pub fn city(&self) -> Result<&str> {
        self.str_at(&["name"])
    }

    /// `weather` is an array; the leading entry describes current conditions.
    pub fn description(&self) -> Result<&str> {
        let weather = self.value_at(&["weather"])?;
        let first = weather.get(0).ok_or_else(|| missing("weather[0]"))?;
        first
            .get("description")
            .ok_or_else(|| missing("weather[0].description"))?
            .as_str()
            .ok_or_else(|| mistyped("weather[0].description", "string"))
    }

    pub fn temp_kelvin(&self) -> Result<f64> {
        self.f64_at(&["main", "temp"])
    }

    pub fn feels_like_kelvin(&self) -> Result<f64> {
        self.f64_at(&["main", "feels_like"])
    }

    pub fn temp_min_kelvin(&self) -> Result<f64> {
        self.f64_at(&["main", "temp_min"])
    }

    pub fn temp_max_kelvin(&self) -> Result<f64> {
        self.f64_at(&["main", "temp_max"])
    }

    pub fn pressure(&self) -> Result<i64> {
        self.i64_at(&["main", "pressure"])
    }

    pub fn humidity(&self) -> Result<i64> {
        self.i64_at(&["main", "humidity"])
    }

    pub fn wind_speed(&self) -> Result<f64> {
        self.f64_at(&["wind", "speed"])
    }

    /// Observation timestamp, seconds since the Unix epoch (UTC).
    pub fn recorded_at_epoch(&self) -> Result<i64> {
        self.i64_at(&["dt"])
    }

    /// Station UTC offset in seconds; negative west of Greenwich.
    pub fn utc_offset_seconds(&self) -> Result<i64> {
        self.i64_at(&["timezone"])
    }

    pub fn sunrise_epoch(&self) -> Result<i64> {
        self.i64_at(&["sys", "sunrise"])
    }

    pub fn sunset_epoch(&self) -> Result<i64> {
        self.i64_at(&["sys", "sunset"])
    }

    fn value_at(&self, path: &[&str]) -> Result<&Value> {
        let mut current = &self.document;
        let mut walked = Vec::with_capacity(path.len());
        for key in path {
            walked.push(*key);
            current = current
                .get(key)
                .ok_or_else(|| missing(&walked.join(".")))?;
        }
        Ok(current)
    }

    fn f64_at(&self, path: &[&str]) -> Result<f64> {
        self.value_at(path)?
            .as_f64()
            .ok_or_else(|| mistyped(&path.join("."), "number"))
    }

    fn i64_at(&self, path: &[&str]) -> Result<i64> {
        self.value_at(path)?
            .as_i64()
            .ok_or_else(|| mistyped(&path.join("."), "integer"))
    }

    fn str_at(&self, path: &[&str]) -> Result<&str> {
        self.value_at(path)?
            .as_str()
            .ok_or_else(|| mistyped(&path.join("."), "string"))
    }
}

fn missing(path: &str) -> AppError {
    AppError::Serialization(format!("response missing required field `{}`", path))
}

fn mistyped(path: &str, expected: &str) -> AppError {
    AppError::Serialization(format!("field `{}` is not a {}", path, expected))
}

/// Flat unit-converted record, ready for tabular serialization.
///
/// Temperatures are Celsius rounded to two decimals. The three
/// timestamps are naive local datetimes with the station's UTC offset
/// already applied; no timezone name is retained.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub city: String,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub wind_speed: f64,
    pub time_of_record: NaiveDateTime,
    pub sunrise_local: NaiveDateTime,
    pub sunset_local: NaiveDateTime,
}

/// Storage name for one run: `current_weather_data_<city>_<ddmmYYYYHHMMSS>`.
///
/// Uniqueness holds only at one-second granularity: two runs generated
/// within the same wall-clock second collide. Known boundary of the
/// naming scheme, kept to preserve the observable key format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity(String);

impl RunIdentity {
    pub fn generate(city: &str, at: DateTime<Utc>) -> Self {
        Self(format!(
            "current_weather_data_{}_{}",
            sanitize_city(city),
            at.format("%d%m%Y%H%M%S")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the run's one-row CSV object is stored.
    pub fn object_key(&self) -> String {
        format!("{}.csv", self.0)
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_city(city: &str) -> String {
    city.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
