// Display color classes shared by the views
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Green,
    Yellow,
    Orange,
    Red,
    Gray,
}

pub fn fuel_level_color(fuel: f64) -> DisplayColor {
    if fuel > 50.0 {
        DisplayColor::Green
    } else if fuel > 25.0 {
        DisplayColor::Yellow
    } else {
        DisplayColor::Red
    }
}

pub fn temperature_color(temperature: f64) -> DisplayColor {
    if temperature <= 95.0 {
        DisplayColor::Green
    } else if temperature <= 100.0 {
        DisplayColor::Yellow
    } else {
        DisplayColor::Red
    }
}
