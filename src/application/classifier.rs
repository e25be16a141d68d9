// Explains an alert the backend already raised. Never decides whether one fires.
use crate::domain::alert::AlertCategory;
use serde::Deserialize;

pub const GENERIC_CAUSE: &str = "Threshold exceeded";

/// Display thresholds used when phrasing a cause.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub speed: f64,
    pub fuel: f64,
    pub temperature: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            speed: 100.0,
            fuel: 20.0,
            temperature: 100.0,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, alert_type: &str, derived_value: Option<&str>) -> String {
        let Some(value) = derived_value.and_then(extract_number) else {
            return GENERIC_CAUSE.to_string();
        };

        match AlertCategory::from_type(alert_type) {
            AlertCategory::Speed => format!("Overspeed: {} km/h > {}", value, self.speed),
            AlertCategory::Fuel => format!("Low Fuel: {}% < {}%", value, self.fuel),
            AlertCategory::Temperature => {
                format!("Overheat: {}°C > {}°C", value, self.temperature)
            }
            AlertCategory::Maintenance | AlertCategory::Other => GENERIC_CAUSE.to_string(),
        }
    }
}

/// Strip everything but digits, `.` and `-`, then read the longest numeric
/// prefix (`"12.5.1%"` reads as 12.5).
pub fn extract_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            d if d.is_ascii_digit() => seen_digit = true,
            _ => break,
        }
        end = i + 1;
    }

    if !seen_digit {
        return None;
    }
    cleaned[..end].trim_end_matches('.').parse().ok()
}
