// View models derived from snapshots. Pure functions of (snapshot, filters, now).
use crate::application::aggregation::{aggregate, count_by, mean};
use crate::application::dashboard_service::{
    AnalyticsSnapshot, DriverSnapshot, FleetSnapshot, HistorySnapshot, SettingsSnapshot,
};
use crate::application::listing::{paginate, CategoryFilter, Page, Pipeline};
use crate::domain::alert::{
    AlertCategory, AlertCounts, AlertRecord, CorrelatedAlert, SeverityBreakdown,
};
use crate::domain::display::DisplayColor;
use crate::domain::fleet::{Car, VehicleRow, VehicleStatus, DEFAULT_MAP_CENTER};
use crate::domain::telemetry::{AggregateStats, TelemetrySample, TelemetryStats};
use crate::domain::time_range::{filter_by_range, TimeRange};
use crate::domain::user::UserAccount;
use chrono::NaiveDateTime;
use serde::Serialize;

pub const NO_ALERTS: &str = "No Alerts";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardView {
    pub vehicles: Vec<VehicleRow>,
    pub total_vehicles: usize,
    pub active: usize,
    pub idle: usize,
    pub alert_counts: AlertCounts,
}

/// Vehicles matching `search` on id, driver or location. Counts cover the
/// whole fleet.
pub fn admin_dashboard(snapshot: &FleetSnapshot, search: &str) -> AdminDashboardView {
    let rows = snapshot.vehicle_rows();
    let active = rows.iter().filter(|r| r.status == VehicleStatus::Active).count();
    let vehicles = Pipeline::new()
        .search(search, |r: &VehicleRow| {
            vec![r.id.clone(), r.driver.clone(), r.location.clone()]
        })
        .apply(&rows);

    AdminDashboardView {
        total_vehicles: rows.len(),
        active,
        idle: rows.len() - active,
        vehicles,
        alert_counts: snapshot.alert_counts,
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub search: String,
    pub severity: CategoryFilter,
    pub car: CategoryFilter,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRow {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub vehicle_id: String,
    pub category: AlertCategory,
    pub severity_color: DisplayColor,
}

impl From<&AlertRecord> for AlertRow {
    fn from(alert: &AlertRecord) -> Self {
        Self {
            vehicle_id: alert.vehicle_id(),
            category: alert.category(),
            severity_color: alert.severity.color(),
            alert: alert.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsView {
    pub total: usize,
    pub breakdown: SeverityBreakdown,
    pub alerts: Page<AlertRow>,
    pub cars: Vec<CarOption>,
}

/// The vehicle filter scopes the whole view, search and severity only the
/// table.
pub fn alerts_view(
    alerts: &[AlertRecord],
    cars: &[Car],
    query: &AlertQuery,
    page_size: usize,
) -> AlertsView {
    let scoped = Pipeline::new()
        .category(query.car.clone(), |a: &AlertRecord| a.car_id.clone().unwrap_or_default())
        .apply(alerts);

    let filtered: Vec<AlertRow> = Pipeline::new()
        .search(&query.search, |a: &AlertRecord| vec![a.alert_type.clone()])
        .category(query.severity.clone(), |a: &AlertRecord| a.severity.as_str().to_string())
        .apply(&scoped)
        .iter()
        .map(AlertRow::from)
        .collect();

    AlertsView {
        total: scoped.len(),
        breakdown: SeverityBreakdown::from_alerts(&scoped),
        alerts: paginate(&filtered, page_size, query.page),
        cars: cars
            .iter()
            .map(|c| CarOption {
                id: c.id.clone(),
                label: c.label(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperaturePoint {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCount {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub vehicle_options: Vec<String>,
    pub total_vehicles: usize,
    pub speed_by_vehicle: Vec<AggregateStats>,
    pub average_temperature: f64,
    pub temperature_samples: usize,
    pub temperature_series: Vec<TemperaturePoint>,
    pub alerts_by_type: Vec<TypeCount>,
    pub total_alerts: usize,
    pub seconds_since_update: Option<i64>,
}

pub fn analytics(
    snapshot: &AnalyticsSnapshot,
    vehicle: &CategoryFilter,
    range: TimeRange,
    now: NaiveDateTime,
) -> AnalyticsView {
    let mut vehicle_options: Vec<String> =
        snapshot.telemetry.iter().map(TelemetrySample::vehicle_id).collect();
    vehicle_options.sort();
    vehicle_options.dedup();

    let telemetry = Pipeline::new()
        .category(vehicle.clone(), TelemetrySample::vehicle_id)
        .apply(&filter_by_range(&snapshot.telemetry, range, now));
    let alerts = Pipeline::new()
        .category(vehicle.clone(), AlertRecord::vehicle_id)
        .apply(&filter_by_range(&snapshot.alerts, range, now));

    let speed_by_vehicle = aggregate(&telemetry, TelemetrySample::vehicle_id, |t| t.speed)
        .into_values()
        .collect();

    let mut temperature_series: Vec<TemperaturePoint> = telemetry
        .iter()
        .filter_map(|t| {
            Some(TemperaturePoint {
                timestamp: t.timestamp?,
                temperature: t.temperature_or_zero(),
            })
        })
        .collect();
    temperature_series.sort_by_key(|p| p.timestamp);

    let by_type = count_by(&alerts, |a| {
        if a.alert_type.is_empty() {
            "Unknown".to_string()
        } else {
            a.alert_type.clone()
        }
    });
    let mut alerts_by_type: Vec<TypeCount> = by_type
        .into_iter()
        .map(|(name, value)| TypeCount { name, value })
        .collect();
    if alerts_by_type.is_empty() {
        alerts_by_type.push(TypeCount {
            name: NO_ALERTS.to_string(),
            value: 1,
        });
    }

    AnalyticsView {
        total_vehicles: vehicle_options.len(),
        vehicle_options,
        speed_by_vehicle,
        average_temperature: round1(mean(&telemetry, |t| t.temperature)),
        temperature_samples: telemetry.len(),
        temperature_series,
        alerts_by_type,
        total_alerts: alerts.len(),
        seconds_since_update: snapshot.fetched_at.map(|t| (now - t).num_seconds().max(0)),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub car_id: String,
    pub range: &'static str,
    pub stats: Option<TelemetryStats>,
    pub telemetry: Page<TelemetrySample>,
}

pub fn history(
    car_id: &str,
    range: TimeRange,
    snapshot: &HistorySnapshot,
    page: usize,
    page_size: usize,
) -> HistoryView {
    HistoryView {
        car_id: car_id.to_string(),
        range: range.token(),
        stats: snapshot.stats.clone(),
        telemetry: paginate(&snapshot.telemetry, page_size, page),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub vehicles: Vec<VehicleRow>,
    pub center: [f64; 2],
}

/// Centered on the first vehicle at a known location.
pub fn map_view(vehicles: Vec<VehicleRow>) -> MapView {
    let center = vehicles
        .iter()
        .find_map(|v| v.coordinates)
        .unwrap_or(DEFAULT_MAP_CENTER);
    MapView { vehicles, center }
}

pub fn fleet_map(snapshot: &FleetSnapshot) -> MapView {
    map_view(snapshot.vehicle_rows())
}

pub fn driver_map(snapshot: &DriverSnapshot) -> MapView {
    let Some(car_id) = snapshot.car_id() else {
        return map_view(Vec::new());
    };
    let car = snapshot.car.clone().unwrap_or_else(|| Car {
        id: car_id.to_string(),
        ..Default::default()
    });
    let driver = snapshot.driver.as_ref().and_then(|d| d.display_name());
    map_view(vec![VehicleRow::build(&car, snapshot.latest.as_ref(), driver)])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestReading {
    pub speed: f64,
    pub fuel_level: f64,
    pub temperature: f64,
    pub location: String,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverDashboardView {
    pub car_id: Option<String>,
    pub latest: LatestReading,
    pub stats: Option<TelemetryStats>,
    pub alerts_last_24h: usize,
    pub recent_alerts: Vec<CorrelatedAlert>,
}

pub fn driver_dashboard(snapshot: &DriverSnapshot, now: NaiveDateTime) -> DriverDashboardView {
    let latest = snapshot.latest.as_ref();
    DriverDashboardView {
        car_id: snapshot.car_id().map(str::to_string),
        latest: LatestReading {
            speed: latest.map(TelemetrySample::speed_or_zero).unwrap_or(0.0),
            fuel_level: latest.map(TelemetrySample::fuel_or_zero).unwrap_or(0.0),
            temperature: latest.map(TelemetrySample::temperature_or_zero).unwrap_or(0.0),
            location: latest
                .and_then(|t| t.location.clone())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            timestamp: latest.and_then(|t| t.timestamp),
        },
        stats: snapshot.stats.clone(),
        alerts_last_24h: filter_by_range(&snapshot.alerts, TimeRange::Last24Hours, now).len(),
        recent_alerts: snapshot.recent.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarAssignmentRow {
    #[serde(flatten)]
    pub car: Car,
    pub driver: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsView {
    pub users: Vec<UserAccount>,
    pub cars: Vec<CarAssignmentRow>,
}

pub fn settings(snapshot: &SettingsSnapshot) -> SettingsView {
    let cars = snapshot
        .cars
        .iter()
        .map(|car| {
            let driver = car
                .assigned_driver_id
                .as_deref()
                .and_then(|id| snapshot.users.iter().find(|u| u.id == id))
                .and_then(|u| u.name.clone())
                .unwrap_or_else(|| "None".to_string());
            CarAssignmentRow {
                car: car.clone(),
                driver,
            }
        })
        .collect();

    SettingsView {
        users: snapshot.users.clone(),
        cars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::tests::{alert, at, fleet_backend, sample};
    use crate::application::dashboard_service::{DashboardService, ViewSettings};
    use std::sync::Arc;

    async fn fleet() -> FleetSnapshot {
        DashboardService::new(Arc::new(fleet_backend()), ViewSettings::default())
            .load_fleet()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_dashboard_search() {
        let snapshot = fleet().await;

        let view = admin_dashboard(&snapshot, "car1");
        assert_eq!(view.vehicles.len(), 1);
        assert_eq!(view.vehicles[0].id, "CAR001");
        assert_eq!(view.total_vehicles, 2);
        assert_eq!((view.active, view.idle), (1, 1));

        let view = admin_dashboard(&snapshot, "john");
        assert_eq!(view.vehicles[0].driver, "John Doe");
        assert_eq!(admin_dashboard(&snapshot, "").vehicles.len(), 2);
    }

    #[tokio::test]
    async fn test_alerts_view_filters() {
        let snapshot = fleet().await;
        let query = AlertQuery {
            search: "fuel".into(),
            page: 1,
            ..Default::default()
        };
        let view = alerts_view(&snapshot.alerts, &snapshot.cars, &query, 10);
        assert_eq!(view.total, 3);
        assert_eq!(view.breakdown.critical, 1);
        assert_eq!(view.alerts.total_items, 1);
        assert_eq!(view.alerts.items[0].category, AlertCategory::Fuel);
        assert_eq!(view.cars[0].label, "Car 1");

        let query = AlertQuery {
            car: CategoryFilter::parse(Some("1")),
            ..Default::default()
        };
        let view = alerts_view(&snapshot.alerts, &snapshot.cars, &query, 10);
        assert_eq!(view.total, 2);
        assert_eq!(view.breakdown.critical, 0);
    }

    #[tokio::test]
    async fn test_no_critical_alerts_gives_single_empty_page() {
        let snapshot = fleet().await;
        let alerts: Vec<_> = snapshot
            .alerts
            .iter()
            .filter(|a| a.severity.as_str() != "CRITICAL")
            .cloned()
            .collect();
        let query = AlertQuery {
            severity: CategoryFilter::parse(Some("CRITICAL")),
            page: 4,
            ..Default::default()
        };
        let view = alerts_view(&alerts, &[], &query, 10);
        assert!(view.alerts.items.is_empty());
        assert_eq!(view.alerts.total_pages, 1);
        assert_eq!(view.alerts.page, 1);
    }

    #[test]
    fn test_analytics_aggregates() {
        let snapshot = AnalyticsSnapshot {
            telemetry: vec![
                sample("C1", "2024-05-01T10:00:00", 50.0, 50.0, 90.0),
                sample("C1", "2024-05-01T11:00:00", 70.0, 50.0, 95.0),
                sample("C2", "2024-05-01T09:00:00", 30.0, 50.0, 100.0),
                sample("C3", "2024-01-01T09:00:00", 99.0, 50.0, 100.0),
            ],
            alerts: vec![
                alert("a1", "C1", "LOW_FUEL", "LOW", "2024-05-01T10:00:00"),
                alert("a2", "C2", "LOW_FUEL", "LOW", "2024-05-01T10:00:00"),
                alert("a3", "C2", "HIGH_SPEED", "LOW", "2024-05-01T10:00:00"),
            ],
            fetched_at: Some(at("2024-05-01T11:59:30")),
        };
        let now = at("2024-05-01T12:00:00");

        let view = analytics(&snapshot, &CategoryFilter::All, TimeRange::Last7Days, now);
        assert_eq!(view.vehicle_options, vec!["C1", "C2", "C3"]);
        assert_eq!(view.speed_by_vehicle.len(), 2);
        assert_eq!(view.speed_by_vehicle[0].average, 60.0);
        assert_eq!(view.speed_by_vehicle[1].max, 30.0);
        assert_eq!(view.average_temperature, 95.0);
        assert_eq!(view.temperature_samples, 3);
        assert_eq!(view.temperature_series[0].timestamp, at("2024-05-01T09:00:00"));
        assert_eq!(view.total_alerts, 3);
        assert_eq!(view.alerts_by_type[1], TypeCount { name: "LOW_FUEL".into(), value: 2 });
        assert_eq!(view.seconds_since_update, Some(30));

        let c3 = CategoryFilter::parse(Some("C3"));
        let only_c3 = analytics(&snapshot, &c3, TimeRange::Last7Days, now);
        assert!(only_c3.speed_by_vehicle.is_empty());
        assert_eq!(only_c3.average_temperature, 0.0);
        assert_eq!(only_c3.alerts_by_type, vec![TypeCount { name: NO_ALERTS.into(), value: 1 }]);
        assert_eq!(only_c3.total_alerts, 0);
    }

    #[test]
    fn test_history_paging() {
        let snapshot = HistorySnapshot {
            telemetry: (0..20)
                .map(|m| sample("1", &format!("2024-05-01T10:{:02}:00", m), 1.0, 1.0, 1.0))
                .collect(),
            stats: None,
        };
        let view = history("1", TimeRange::Last7Days, &snapshot, 2, 15);
        assert_eq!(view.range, "7d");
        assert_eq!(view.telemetry.items.len(), 5);
        assert_eq!(view.telemetry.total_pages, 2);
    }

    #[tokio::test]
    async fn test_map_center() {
        let view = fleet_map(&fleet().await);
        assert_eq!(view.center, [41.8781, -87.6298]);
        assert_eq!(map_view(Vec::new()).center, DEFAULT_MAP_CENTER);
    }

    #[tokio::test]
    async fn test_driver_views() {
        let service = DashboardService::new(Arc::new(fleet_backend()), ViewSettings::default());
        let now = at("2024-05-01T12:00:00");
        let snapshot = service.load_driver("7", now).await.unwrap();

        let view = driver_dashboard(&snapshot, now);
        assert_eq!(view.car_id.as_deref(), Some("1"));
        assert_eq!(view.latest.fuel_level, 12.0);
        assert_eq!(view.alerts_last_24h, 1);
        assert_eq!(view.recent_alerts.len(), 2);

        let map = driver_map(&snapshot);
        assert_eq!(map.vehicles[0].id, "CAR001");
        assert_eq!(map.vehicles[0].driver, "John Doe");

        let empty = driver_dashboard(&DriverSnapshot::default(), now);
        assert_eq!(empty.latest.location, "-");
        assert!(driver_map(&DriverSnapshot::default()).vehicles.is_empty());
    }

    #[test]
    fn test_settings_driver_names() {
        let snapshot = SettingsSnapshot {
            users: vec![UserAccount {
                id: "7".into(),
                name: Some("John Doe".into()),
                ..Default::default()
            }],
            cars: vec![
                Car {
                    id: "1".into(),
                    assigned_driver_id: Some("7".into()),
                    ..Default::default()
                },
                Car {
                    id: "2".into(),
                    ..Default::default()
                },
            ],
        };
        let view = settings(&snapshot);
        assert_eq!(view.cars[0].driver, "John Doe");
        assert_eq!(view.cars[1].driver, "None");
    }
}
