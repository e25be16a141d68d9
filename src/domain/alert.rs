// Alert domain models
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::display::DisplayColor;
use super::lenient;
use super::telemetry::{vehicle_id, CarRef, Metric};
use super::time_range::Timestamped;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Unknown(String),
}

impl Severity {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "LOW" => Severity::Low,
            "MEDIUM" => Severity::Medium,
            "HIGH" => Severity::High,
            "CRITICAL" => Severity::Critical,
            other => Severity::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
            Severity::Unknown(raw) => raw,
        }
    }

    /// Badge color for the severity column.
    pub fn color(&self) -> DisplayColor {
        match self {
            Severity::Low => DisplayColor::Green,
            Severity::Medium => DisplayColor::Yellow,
            Severity::High => DisplayColor::Orange,
            Severity::Critical => DisplayColor::Red,
            Severity::Unknown(_) => DisplayColor::Gray,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unknown(String::new())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => Severity::parse(&s),
            _ => Severity::default(),
        })
    }
}

/// Broad alert family, derived from the free-form type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Fuel,
    Temperature,
    Maintenance,
    Speed,
    Other,
}

impl AlertCategory {
    /// Case-insensitive substring match on the alert type.
    pub fn from_type(alert_type: &str) -> Self {
        let t = alert_type.to_lowercase();
        if t.contains("speed") {
            AlertCategory::Speed
        } else if t.contains("fuel") {
            AlertCategory::Fuel
        } else if t.contains("temp") {
            AlertCategory::Temperature
        } else if t.contains("maintenance") {
            AlertCategory::Maintenance
        } else {
            AlertCategory::Other
        }
    }

    /// Telemetry field that explains alerts of this category.
    pub fn metric(&self) -> Option<Metric> {
        match self {
            AlertCategory::Speed => Some(Metric::Speed),
            AlertCategory::Fuel => Some(Metric::FuelLevel),
            AlertCategory::Temperature => Some(Metric::Temperature),
            AlertCategory::Maintenance | AlertCategory::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(deserialize_with = "lenient::required_identifier")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub car_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::nested", skip_serializing_if = "Option::is_none")]
    pub car: Option<CarRef>,
    #[serde(rename = "type", default, deserialize_with = "lenient::text_or_empty")]
    pub alert_type: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub acknowledged: bool,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
}

impl AlertRecord {
    pub fn vehicle_id(&self) -> String {
        vehicle_id(self.car.as_ref(), self.car_id.as_deref())
    }

    pub fn category(&self) -> AlertCategory {
        AlertCategory::from_type(&self.alert_type)
    }
}

impl Timestamped for AlertRecord {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }
}

/// An alert explained by the telemetry sample nearest to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedAlert {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub derived_value: Option<String>,
    pub cause: String,
}

/// Count of alerts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SeverityBreakdown {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityBreakdown {
    pub fn from_alerts(alerts: &[AlertRecord]) -> Self {
        let mut counts = Self::default();
        for alert in alerts {
            match alert.severity {
                Severity::Low => counts.low += 1,
                Severity::Medium => counts.medium += 1,
                Severity::High => counts.high += 1,
                Severity::Critical => counts.critical += 1,
                Severity::Unknown(_) => {}
            }
        }
        counts
    }
}

/// Alert summary served by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCounts {
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_alerts: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub unacknowledged_alerts: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub critical_alerts: u64,
}
