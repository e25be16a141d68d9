// Telemetry data domain models
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::lenient;
use super::time_range::Timestamped;

pub const UNKNOWN_VEHICLE: &str = "UNKNOWN";

/// Car reference some endpoints embed in their records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRef {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub display_id: Option<String>,
}

/// One timestamped reading of a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub car_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::nested", skip_serializing_if = "Option::is_none")]
    pub car: Option<CarRef>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fuel_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub location: Option<String>,
}

impl TelemetrySample {
    /// Display identifier: embedded display id, embedded id, then `carId`.
    pub fn vehicle_id(&self) -> String {
        vehicle_id(self.car.as_ref(), self.car_id.as_deref())
    }

    pub fn speed_or_zero(&self) -> f64 {
        self.speed.unwrap_or(0.0)
    }

    pub fn fuel_or_zero(&self) -> f64 {
        self.fuel_level.unwrap_or(0.0)
    }

    pub fn temperature_or_zero(&self) -> f64 {
        self.temperature.unwrap_or(0.0)
    }

    pub fn value_of(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Speed => self.speed,
            Metric::FuelLevel => self.fuel_level,
            Metric::Temperature => self.temperature,
        }
    }
}

impl Timestamped for TelemetrySample {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }
}

pub(crate) fn vehicle_id(car: Option<&CarRef>, car_id: Option<&str>) -> String {
    car.and_then(|c| c.display_id.clone().filter(|s| !s.is_empty()).or_else(|| c.id.clone()))
        .or_else(|| car_id.map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_VEHICLE.to_string())
}

/// Numeric telemetry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Speed,
    FuelLevel,
    Temperature,
}

impl Metric {
    /// Display form of a reading, e.g. `12%` or `105 km/h`.
    pub fn format(&self, value: f64) -> String {
        match self {
            Metric::Speed => format!("{} km/h", value),
            Metric::FuelLevel => format!("{}%", value),
            Metric::Temperature => format!("{}°C", value),
        }
    }
}

/// Summary over a group of samples sharing a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub group_key: String,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}

impl AggregateStats {
    pub fn empty(group_key: impl Into<String>) -> Self {
        Self {
            group_key: group_key.into(),
            average: 0.0,
            max: 0.0,
            min: 0.0,
            count: 0,
        }
    }
}

/// Per-car statistics computed by the backend over a time range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryStats {
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_fuel: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_fuel: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_fuel: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub average_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub min_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub max_temperature: Option<f64>,
}
