// Fleet domain models: cars, driver assignments and the joined vehicle row
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::display::{fuel_level_color, temperature_color, DisplayColor};
use super::lenient;
use super::telemetry::TelemetrySample;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(deserialize_with = "lenient::required_identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub display_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub number_plate: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub assigned_driver_id: Option<String>,
}

impl Car {
    pub fn display_id(&self) -> &str {
        self.display_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    /// Label used in vehicle pickers.
    pub fn label(&self) -> String {
        match self.model.as_deref().filter(|m| !m.is_empty()) {
            Some(model) => model.to_string(),
            None => format!("Car {}", self.id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssignment {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub assigned_car_id: Option<String>,
}

impl DriverAssignment {
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.username.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Idle,
}

impl VehicleStatus {
    pub fn from_speed(speed: f64) -> Self {
        if speed > 0.0 {
            VehicleStatus::Active
        } else {
            VehicleStatus::Idle
        }
    }
}

/// A car joined with its latest telemetry and assigned driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRow {
    pub id: String,
    pub car_id: String,
    pub driver: String,
    pub location: String,
    pub speed: f64,
    pub fuel: f64,
    pub temp: f64,
    pub fuel_color: DisplayColor,
    pub temp_color: DisplayColor,
    pub status: VehicleStatus,
    pub last_update: Option<NaiveDateTime>,
    pub coordinates: Option<[f64; 2]>,
}

impl VehicleRow {
    pub fn build(car: &Car, latest: Option<&TelemetrySample>, driver: Option<&str>) -> Self {
        let speed = latest.map(TelemetrySample::speed_or_zero).unwrap_or(0.0);
        let fuel = latest.map(TelemetrySample::fuel_or_zero).unwrap_or(0.0);
        let temp = latest.map(TelemetrySample::temperature_or_zero).unwrap_or(0.0);
        let location = latest
            .and_then(|t| t.location.clone())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "-".to_string());

        Self {
            id: car.display_id().to_string(),
            car_id: car.id.clone(),
            driver: driver.unwrap_or("-").to_string(),
            coordinates: city_coordinates(&location),
            location,
            speed,
            fuel,
            temp,
            fuel_color: fuel_level_color(fuel),
            temp_color: temperature_color(temp),
            status: VehicleStatus::from_speed(speed),
            last_update: latest.and_then(|t| t.timestamp),
        }
    }
}

/// Known city locations for map placement.
pub const CITY_COORDS: &[(&str, [f64; 2])] = &[
    ("New York, NY", [40.7128, -74.006]),
    ("Los Angeles, CA", [34.0522, -118.2437]),
    ("Chicago, IL", [41.8781, -87.6298]),
    ("Houston, TX", [29.7604, -95.3698]),
    ("Phoenix, AZ", [33.4484, -112.074]),
    ("Philadelphia, PA", [39.9526, -75.1652]),
    ("San Antonio, TX", [29.4241, -98.4936]),
    ("San Diego, CA", [32.7157, -117.1611]),
    ("Dallas, TX", [32.7767, -96.797]),
    ("San Jose, CA", [37.3382, -121.8863]),
];

/// Map center used when no vehicle has a known location.
pub const DEFAULT_MAP_CENTER: [f64; 2] = [40.0, -100.0];

pub fn city_coordinates(location: &str) -> Option<[f64; 2]> {
    CITY_COORDS
        .iter()
        .find(|(city, _)| *city == location)
        .map(|(_, coords)| *coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_range::parse_timestamp;

    #[test]
    fn test_vehicle_row_join() {
        let car = Car {
            id: "1".into(),
            display_id: Some("CAR001".into()),
            ..Default::default()
        };
        let latest = TelemetrySample {
            car_id: Some("1".into()),
            timestamp: parse_timestamp("2024-05-01T10:00:00"),
            speed: Some(55.0),
            fuel_level: Some(22.0),
            temperature: Some(97.0),
            location: Some("Chicago, IL".into()),
            ..Default::default()
        };

        let row = VehicleRow::build(&car, Some(&latest), Some("John Doe"));
        assert_eq!(row.id, "CAR001");
        assert_eq!(row.driver, "John Doe");
        assert_eq!(row.status, VehicleStatus::Active);
        assert_eq!(row.fuel_color, DisplayColor::Red);
        assert_eq!(row.temp_color, DisplayColor::Yellow);
        assert_eq!(row.coordinates, Some([41.8781, -87.6298]));
    }

    #[test]
    fn test_vehicle_row_without_telemetry() {
        let car = Car {
            id: "2".into(),
            ..Default::default()
        };
        let row = VehicleRow::build(&car, None, None);
        assert_eq!(row.id, "2");
        assert_eq!(row.driver, "-");
        assert_eq!(row.location, "-");
        assert_eq!(row.status, VehicleStatus::Idle);
        assert_eq!(row.coordinates, None);
        assert_eq!(row.last_update, None);
    }

    #[test]
    fn test_driver_name_falls_back_to_username() {
        let d = DriverAssignment {
            username: Some("jdoe".into()),
            ..Default::default()
        };
        assert_eq!(d.display_name(), Some("jdoe"));
        let car = Car {
            id: "5".into(),
            ..Default::default()
        };
        assert_eq!(car.label(), "Car 5");
    }
}
