use chrono::{DateTime, NaiveDateTime};

use crate::error::{AppError, Result};
use crate::model::{NormalizedRecord, WeatherReading};

/// Column order of the persisted record. Fixed: downstream consumers
/// read these objects positionally.
pub const COLUMNS: [&str; 12] = [
    "City",
    "Description",
    "Temperature (C)",
    "Feels Like (C)",
    "Minimum Temp (C)",
    "Maximum Temp (C)",
    "Pressure",
    "Humidity",
    "Wind Speed",
    "Time of Record",
    "Sunrise (Local Time)",
    "Sunset (Local Time)",
];

/// Build the flat output record from a raw reading. Pure function, no
/// I/O; every missing or mistyped upstream field surfaces here as a
/// `Serialization` error before anything is written.
pub fn normalize(reading: &WeatherReading) -> Result<NormalizedRecord> {
    let utc_offset = reading.utc_offset_seconds()?;

    Ok(NormalizedRecord {
        city: reading.city()?.to_string(),
        description: reading.description()?.to_string(),
        temperature_c: kelvin_to_celsius(reading.temp_kelvin()?),
        feels_like_c: kelvin_to_celsius(reading.feels_like_kelvin()?),
        temp_min_c: kelvin_to_celsius(reading.temp_min_kelvin()?),
        temp_max_c: kelvin_to_celsius(reading.temp_max_kelvin()?),
        pressure: reading.pressure()?,
        humidity: reading.humidity()?,
        wind_speed: reading.wind_speed()?,
        time_of_record: local_datetime(reading.recorded_at_epoch()?, utc_offset)?,
        sunrise_local: local_datetime(reading.sunrise_epoch()?, utc_offset)?,
        sunset_local: local_datetime(reading.sunset_epoch()?, utc_offset)?,
    })
}

/// Celsius = Kelvin - 273.15, rounded to two decimals. Applied
/// identically to all four temperature fields.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    round2(kelvin - 273.15)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shift an epoch timestamp by the station's UTC offset and drop the
/// zone, yielding naive wall-clock time at the station.
pub fn local_datetime(epoch_seconds: i64, utc_offset_seconds: i64) -> Result<NaiveDateTime> {
    epoch_seconds
        .checked_add(utc_offset_seconds)
        .and_then(|shifted| DateTime::from_timestamp(shifted, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            AppError::Serialization(format!(
                "timestamp {} with offset {} is out of range",
                epoch_seconds, utc_offset_seconds
            ))
        })
}

/// Serialize one record as a two-line CSV object (header + one row).
pub fn to_csv(record: &NormalizedRecord) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(COLUMNS)
        .map_err(|e| AppError::Serialization(format!("CSV header: {}", e)))?;

    writer
        .write_record(&[
            record.city.clone(),
            record.description.clone(),
            format_float(record.temperature_c),
            format_float(record.feels_like_c),
            format_float(record.temp_min_c),
            format_float(record.temp_max_c),
            record.pressure.to_string(),
            record.humidity.to_string(),
            format_float(record.wind_speed),
            record.time_of_record.to_string(),
            record.sunrise_local.to_string(),
            record.sunset_local.to_string(),
        ])
        .map_err(|e| AppError::Serialization(format!("CSV row: {}", e)))?;

    writer
        .into_inner()
        .map_err(|e| AppError::Serialization(format!("CSV flush: {}", e)))
}

/// Float columns keep a decimal point even when integral (`6` ->
/// `6.0`) so they read back as floats in downstream tools.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
