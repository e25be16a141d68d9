// Dashboard service - batch loading of view snapshots
use crate::application::classifier::Thresholds;
use crate::application::correlation::{
    correlate, correlation_window, recent_alerts, sort_newest_first, RECENT_ALERTS,
    WINDOW_MARGIN_MINUTES,
};
use crate::application::fleet_backend::FleetBackend;
use crate::application::refresh::LiveView;
use crate::domain::alert::{AlertCounts, AlertRecord, CorrelatedAlert};
use crate::domain::fleet::{Car, DriverAssignment, VehicleRow};
use crate::domain::telemetry::{TelemetrySample, TelemetryStats};
use crate::domain::time_range::TimeRange;
use crate::domain::user::{Role, UserAccount, UserProfile};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Tunables shared by the views.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub alerts_page_size: usize,
    pub history_page_size: usize,
    pub recent_alerts: usize,
    pub window_margin: Duration,
    pub thresholds: Thresholds,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            alerts_page_size: 10,
            history_page_size: 15,
            recent_alerts: RECENT_ALERTS,
            window_margin: Duration::minutes(WINDOW_MARGIN_MINUTES),
            thresholds: Thresholds::default(),
        }
    }
}

/// Everything the admin pages render, fetched as one batch.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub cars: Vec<Car>,
    pub latest: Vec<TelemetrySample>,
    pub drivers: Vec<DriverAssignment>,
    pub alert_counts: AlertCounts,
    pub alerts: Vec<AlertRecord>,
}

impl FleetSnapshot {
    /// One row per car, joined with its latest sample and driver.
    pub fn vehicle_rows(&self) -> Vec<VehicleRow> {
        let drivers: HashMap<&str, &str> = self
            .drivers
            .iter()
            .filter_map(|d| Some((d.assigned_car_id.as_deref()?, d.display_name()?)))
            .collect();

        self.cars
            .iter()
            .map(|car| {
                let latest = self
                    .latest
                    .iter()
                    .find(|t| t.car_id.as_deref() == Some(car.id.as_str()));
                VehicleRow::build(car, latest, drivers.get(car.id.as_str()).copied())
            })
            .collect()
    }

    pub fn set_acknowledged(&mut self, alert_id: &str, acknowledged: bool) -> Option<bool> {
        let alert = self.alerts.iter_mut().find(|a| a.id == alert_id)?;
        Some(std::mem::replace(&mut alert.acknowledged, acknowledged))
    }
}

/// Everything the driver pages render for one assigned car.
#[derive(Debug, Clone, Default)]
pub struct DriverSnapshot {
    pub driver: Option<DriverAssignment>,
    pub car: Option<Car>,
    pub latest: Option<TelemetrySample>,
    pub stats: Option<TelemetryStats>,
    /// Newest first.
    pub alerts: Vec<AlertRecord>,
    pub recent: Vec<CorrelatedAlert>,
}

impl DriverSnapshot {
    pub fn car_id(&self) -> Option<&str> {
        self.driver.as_ref().and_then(|d| d.assigned_car_id.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsSnapshot {
    pub telemetry: Vec<TelemetrySample>,
    pub alerts: Vec<AlertRecord>,
    pub fetched_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    pub telemetry: Vec<TelemetrySample>,
    pub stats: Option<TelemetryStats>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    pub users: Vec<UserAccount>,
    pub cars: Vec<Car>,
}

/// The live view owned by the signed-in user.
pub enum ActiveView {
    Fleet(LiveView<FleetSnapshot>),
    Driver(LiveView<DriverSnapshot>),
}

impl ActiveView {
    pub fn dispose(&self) {
        match self {
            ActiveView::Fleet(view) => view.dispose(),
            ActiveView::Driver(view) => view.dispose(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self {
            ActiveView::Fleet(view) => view.is_disposed(),
            ActiveView::Driver(view) => view.is_disposed(),
        }
    }

    pub async fn refresh_now(&self) -> bool {
        match self {
            ActiveView::Fleet(view) => view.refresh_now().await,
            ActiveView::Driver(view) => view.refresh_now().await,
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    backend: Arc<dyn FleetBackend>,
    settings: ViewSettings,
}

impl DashboardService {
    pub fn new(backend: Arc<dyn FleetBackend>, settings: ViewSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// Start the live view for `user`'s role.
    pub fn open(&self, user: &UserProfile, interval: StdDuration) -> ActiveView {
        match user.role {
            Role::Admin => {
                let service = self.clone();
                ActiveView::Fleet(
                    LiveView::new("fleet", move || {
                        let service = service.clone();
                        async move { service.load_fleet().await }
                    })
                    .start(interval),
                )
            }
            Role::Driver => {
                let service = self.clone();
                let user_id = user.id.clone();
                ActiveView::Driver(
                    LiveView::new("driver", move || {
                        let service = service.clone();
                        let user_id = user_id.clone();
                        async move {
                            let now = chrono::Local::now().naive_local();
                            service.load_driver(&user_id, now).await
                        }
                    })
                    .start(interval),
                )
            }
        }
    }

    /// All-or-nothing: a failure anywhere rejects the whole batch.
    pub async fn load_fleet(&self) -> anyhow::Result<FleetSnapshot> {
        let backend = &self.backend;
        let (latest, drivers, alert_counts, cars, alerts) = tokio::try_join!(
            backend.latest_telemetry_all(),
            backend.assigned_drivers(),
            backend.alert_counts(),
            backend.cars(),
            backend.alerts(),
        )?;

        tracing::debug!(cars = cars.len(), alerts = alerts.len(), "fleet snapshot loaded");
        Ok(FleetSnapshot {
            cars,
            latest,
            drivers,
            alert_counts,
            alerts,
        })
    }

    pub async fn load_driver(
        &self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> anyhow::Result<DriverSnapshot> {
        let driver = self.backend.driver_for_user(user_id).await?;
        let Some(car_id) = driver.as_ref().and_then(|d| d.assigned_car_id.clone()) else {
            tracing::debug!(user_id, "no vehicle assigned");
            return Ok(DriverSnapshot {
                driver,
                ..Default::default()
            });
        };

        let day = TimeRange::Last24Hours.bounds(now);
        let (car, latest, stats, (alerts, recent)) = tokio::try_join!(
            self.backend.car(&car_id),
            self.backend.latest_telemetry(&car_id),
            self.backend.telemetry_stats(&car_id, Some(day)),
            self.load_recent_alerts(&car_id),
        )?;

        Ok(DriverSnapshot {
            driver,
            car,
            latest: latest.into_iter().next(),
            stats,
            alerts,
            recent,
        })
    }

    /// Car alerts newest first, plus the most recent few explained by the
    /// telemetry around them.
    async fn load_recent_alerts(
        &self,
        car_id: &str,
    ) -> anyhow::Result<(Vec<AlertRecord>, Vec<CorrelatedAlert>)> {
        let mut alerts = self.backend.car_alerts(car_id).await?;
        sort_newest_first(&mut alerts);

        let candidates = recent_alerts(&alerts, self.settings.recent_alerts);
        let samples = match correlation_window(&candidates, self.settings.window_margin) {
            Some((start, end)) => self
                .backend
                .telemetry_range(car_id, start, end)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(car_id, "correlation window fetch failed: {:#}", e);
                    Vec::new()
                }),
            None => Vec::new(),
        };

        let recent = correlate(&candidates, &samples, &self.settings.thresholds);
        Ok((alerts, recent))
    }

    pub async fn load_analytics(&self, now: NaiveDateTime) -> anyhow::Result<AnalyticsSnapshot> {
        let (telemetry, alerts) =
            tokio::try_join!(self.backend.all_telemetry(), self.backend.alerts())?;
        Ok(AnalyticsSnapshot {
            telemetry,
            alerts,
            fetched_at: Some(now),
        })
    }

    /// Range query, falling back to the unbounded history when the range is
    /// empty and to all-time stats when the ranged stats are missing.
    pub async fn load_history(
        &self,
        car_id: &str,
        range: TimeRange,
        now: NaiveDateTime,
    ) -> anyhow::Result<HistorySnapshot> {
        let (start, end) = range.bounds(now);
        let (mut telemetry, mut stats) = tokio::try_join!(
            self.backend.telemetry_range(car_id, start, end),
            self.backend.telemetry_stats(car_id, Some((start, end))),
        )?;

        if telemetry.is_empty() {
            tracing::debug!(car_id, range = range.token(), "empty range, using full history");
            telemetry = self.backend.telemetry_history(car_id).await?;
        }
        if stats.is_none() {
            stats = self.backend.telemetry_stats(car_id, None).await?;
        }

        Ok(HistorySnapshot { telemetry, stats })
    }

    pub async fn load_settings(&self) -> anyhow::Result<SettingsSnapshot> {
        let (users, cars) = tokio::try_join!(self.backend.users(), self.backend.cars())?;
        Ok(SettingsSnapshot { users, cars })
    }

    /// Flip an alert's acknowledged flag in the live view, then persist it.
    /// The local change is rolled back if the backend refuses.
    pub async fn acknowledge(
        &self,
        view: &LiveView<FleetSnapshot>,
        alert_id: &str,
        acknowledged: bool,
    ) -> anyhow::Result<()> {
        let previous = view
            .update(|s| s.set_acknowledged(alert_id, acknowledged))
            .await
            .flatten();

        if let Err(e) = self.backend.set_acknowledged(alert_id, acknowledged).await {
            tracing::warn!(alert_id, "acknowledge failed, reverting: {:#}", e);
            if let Some(previous) = previous {
                view.update(|s| s.set_acknowledged(alert_id, previous)).await;
            }
            return Err(e);
        }

        tracing::info!(alert_id, acknowledged, "alert acknowledgement updated");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::fleet_backend::FleetBackend;
    use crate::domain::alert::Severity;
    use crate::domain::time_range::parse_timestamp;
    use crate::domain::user::{Credentials, LoginGrant, Registration};
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub(crate) fn at(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    /// In-memory backend double.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub telemetry: Vec<TelemetrySample>,
        pub alerts: Vec<AlertRecord>,
        pub cars: Vec<Car>,
        pub drivers: Vec<DriverAssignment>,
        pub users: Vec<UserAccount>,
        pub stats: Option<TelemetryStats>,
        pub fail_alerts: bool,
        pub fail_acknowledge: bool,
        pub acknowledge_delay: Option<std::time::Duration>,
        /// Usernames whose login takes a while.
        pub slow_logins: Vec<String>,
        pub range_calls: Mutex<Vec<(String, NaiveDateTime, NaiveDateTime)>>,
        pub acknowledged: Mutex<Vec<(String, bool)>>,
    }

    impl FakeBackend {
        fn car_samples(&self, car_id: &str) -> Vec<TelemetrySample> {
            self.telemetry
                .iter()
                .filter(|t| t.car_id.as_deref() == Some(car_id))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl FleetBackend for FakeBackend {
        async fn latest_telemetry_all(&self) -> anyhow::Result<Vec<TelemetrySample>> {
            let mut latest: Vec<TelemetrySample> = Vec::new();
            for sample in &self.telemetry {
                match latest.iter_mut().find(|t| t.car_id == sample.car_id) {
                    Some(existing) if existing.timestamp < sample.timestamp => {
                        *existing = sample.clone()
                    }
                    Some(_) => {}
                    None => latest.push(sample.clone()),
                }
            }
            Ok(latest)
        }

        async fn all_telemetry(&self) -> anyhow::Result<Vec<TelemetrySample>> {
            Ok(self.telemetry.clone())
        }

        async fn latest_telemetry(&self, car_id: &str) -> anyhow::Result<Vec<TelemetrySample>> {
            let mut samples = self.car_samples(car_id);
            samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            Ok(samples)
        }

        async fn telemetry_range(
            &self,
            car_id: &str,
            start: NaiveDateTime,
            end: NaiveDateTime,
        ) -> anyhow::Result<Vec<TelemetrySample>> {
            self.range_calls
                .lock()
                .unwrap()
                .push((car_id.to_string(), start, end));
            Ok(self
                .car_samples(car_id)
                .into_iter()
                .filter(|t| matches!(t.timestamp, Some(ts) if ts >= start && ts <= end))
                .collect())
        }

        async fn telemetry_history(&self, car_id: &str) -> anyhow::Result<Vec<TelemetrySample>> {
            Ok(self.car_samples(car_id))
        }

        async fn telemetry_stats(
            &self,
            _car_id: &str,
            range: Option<(NaiveDateTime, NaiveDateTime)>,
        ) -> anyhow::Result<Option<TelemetryStats>> {
            Ok(match range {
                Some(_) => self.stats.clone(),
                None => Some(TelemetryStats::default()),
            })
        }

        async fn alerts(&self) -> anyhow::Result<Vec<AlertRecord>> {
            if self.fail_alerts {
                anyhow::bail!("alerts endpoint unavailable");
            }
            Ok(self.alerts.clone())
        }

        async fn car_alerts(&self, car_id: &str) -> anyhow::Result<Vec<AlertRecord>> {
            Ok(self
                .alerts
                .iter()
                .filter(|a| a.car_id.as_deref() == Some(car_id))
                .cloned()
                .collect())
        }

        async fn alert_counts(&self) -> anyhow::Result<AlertCounts> {
            Ok(AlertCounts {
                total_alerts: self.alerts.len() as u64,
                unacknowledged_alerts: self
                    .alerts
                    .iter()
                    .filter(|a| !a.acknowledged)
                    .count() as u64,
                critical_alerts: self
                    .alerts
                    .iter()
                    .filter(|a| a.severity == Severity::Critical)
                    .count() as u64,
            })
        }

        async fn set_acknowledged(&self, alert_id: &str, acknowledged: bool) -> anyhow::Result<()> {
            if let Some(delay) = self.acknowledge_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_acknowledge {
                anyhow::bail!("acknowledge rejected");
            }
            self.acknowledged
                .lock()
                .unwrap()
                .push((alert_id.to_string(), acknowledged));
            Ok(())
        }

        async fn cars(&self) -> anyhow::Result<Vec<Car>> {
            Ok(self.cars.clone())
        }

        async fn car(&self, car_id: &str) -> anyhow::Result<Option<Car>> {
            Ok(self.cars.iter().find(|c| c.id == car_id).cloned())
        }

        async fn assigned_drivers(&self) -> anyhow::Result<Vec<DriverAssignment>> {
            Ok(self
                .drivers
                .iter()
                .filter(|d| d.assigned_car_id.is_some())
                .cloned()
                .collect())
        }

        async fn driver_for_user(&self, user_id: &str) -> anyhow::Result<Option<DriverAssignment>> {
            Ok(self
                .drivers
                .iter()
                .find(|d| d.user_id.as_deref() == Some(user_id))
                .cloned())
        }

        async fn users(&self) -> anyhow::Result<Vec<UserAccount>> {
            Ok(self.users.clone())
        }

        async fn login(&self, credentials: &Credentials) -> anyhow::Result<LoginGrant> {
            if self.slow_logins.contains(&credentials.username) {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
            if credentials.password != "secret1" {
                anyhow::bail!("Invalid username or password");
            }
            let role = if credentials.username == "admin" { Role::Admin } else { Role::Driver };
            Ok(LoginGrant {
                token: Some(format!("token-{}", credentials.username)),
                user_id: "7".into(),
                username: credentials.username.clone(),
                role,
                name: None,
            })
        }

        async fn register(&self, registration: &Registration) -> anyhow::Result<UserAccount> {
            Ok(UserAccount {
                id: "99".into(),
                username: Some(registration.username.clone()),
                name: Some(registration.name.clone()),
                ..Default::default()
            })
        }
    }

    pub(crate) fn sample(car: &str, ts: &str, speed: f64, fuel: f64, temp: f64) -> TelemetrySample {
        TelemetrySample {
            car_id: Some(car.into()),
            timestamp: Some(at(ts)),
            speed: Some(speed),
            fuel_level: Some(fuel),
            temperature: Some(temp),
            location: Some("Chicago, IL".into()),
            ..Default::default()
        }
    }

    pub(crate) fn alert(id: &str, car: &str, kind: &str, severity: &str, ts: &str) -> AlertRecord {
        AlertRecord {
            id: id.into(),
            car_id: Some(car.into()),
            alert_type: kind.into(),
            severity: Severity::parse(severity),
            timestamp: Some(at(ts)),
            ..Default::default()
        }
    }

    pub(crate) fn fleet_backend() -> FakeBackend {
        FakeBackend {
            telemetry: vec![
                sample("1", "2024-05-01T09:00:00", 40.0, 60.0, 90.0),
                sample("1", "2024-05-01T10:01:00", 0.0, 12.0, 92.0),
                sample("2", "2024-05-01T09:30:00", 80.0, 45.0, 101.0),
            ],
            alerts: vec![
                alert("a1", "1", "LOW_FUEL", "HIGH", "2024-05-01T10:00:00"),
                alert("a2", "2", "HIGH_TEMPERATURE", "CRITICAL", "2024-05-01T09:31:00"),
                alert("a3", "1", "HIGH_SPEED", "LOW", "2024-04-20T09:00:00"),
            ],
            cars: vec![
                Car {
                    id: "1".into(),
                    display_id: Some("CAR001".into()),
                    ..Default::default()
                },
                Car {
                    id: "2".into(),
                    display_id: Some("CAR002".into()),
                    ..Default::default()
                },
            ],
            drivers: vec![DriverAssignment {
                user_id: Some("7".into()),
                name: Some("John Doe".into()),
                assigned_car_id: Some("1".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_fleet_joins_rows() {
        let service = DashboardService::new(Arc::new(fleet_backend()), ViewSettings::default());
        let snapshot = service.load_fleet().await.unwrap();

        let rows = snapshot.vehicle_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "CAR001");
        assert_eq!(rows[0].driver, "John Doe");
        assert_eq!(rows[0].fuel, 12.0);
        assert_eq!(rows[1].driver, "-");
        assert_eq!(snapshot.alert_counts.critical_alerts, 1);
    }

    #[tokio::test]
    async fn test_partial_batch_is_rejected() {
        let backend = FakeBackend {
            fail_alerts: true,
            ..fleet_backend()
        };
        let service = DashboardService::new(Arc::new(backend), ViewSettings::default());
        assert!(service.load_fleet().await.is_err());
    }

    #[tokio::test]
    async fn test_load_driver_correlates_recent_alerts() {
        let backend = Arc::new(fleet_backend());
        let service = DashboardService::new(backend.clone(), ViewSettings::default());
        let snapshot = service
            .load_driver("7", at("2024-05-01T12:00:00"))
            .await
            .unwrap();

        assert_eq!(snapshot.car_id(), Some("1"));
        assert_eq!(snapshot.latest.as_ref().unwrap().fuel_level, Some(12.0));
        assert_eq!(
            snapshot.alerts.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["a1", "a3"]
        );
        assert_eq!(snapshot.recent[0].cause, "Low Fuel: 12% < 20%");

        let calls = backend.range_calls.lock().unwrap();
        assert_eq!(calls[0].1, at("2024-04-20T08:50:00"));
        assert_eq!(calls[0].2, at("2024-05-01T10:10:00"));
    }

    #[tokio::test]
    async fn test_load_driver_without_vehicle() {
        let service = DashboardService::new(Arc::new(fleet_backend()), ViewSettings::default());
        let snapshot = service
            .load_driver("unknown", at("2024-05-01T12:00:00"))
            .await
            .unwrap();
        assert!(snapshot.car_id().is_none());
        assert!(snapshot.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_history_falls_back_to_full_history() {
        let backend = Arc::new(fleet_backend());
        let service = DashboardService::new(backend.clone(), ViewSettings::default());
        let history = service
            .load_history("1", TimeRange::Last24Hours, at("2024-06-01T00:00:00"))
            .await
            .unwrap();
        assert_eq!(history.telemetry.len(), 2);
        assert_eq!(history.stats, Some(TelemetryStats::default()));
    }

    #[tokio::test]
    async fn test_acknowledge_is_optimistic() {
        let backend = Arc::new(fleet_backend());
        let service = DashboardService::new(backend.clone(), ViewSettings::default());
        let loader = service.clone();
        let view = LiveView::new("fleet", move || {
            let loader = loader.clone();
            async move { loader.load_fleet().await }
        });
        view.refresh_now().await;

        service.acknowledge(&view, "a1", true).await.unwrap();
        let snapshot = view.snapshot().await.unwrap();
        assert!(snapshot.alerts.iter().find(|a| a.id == "a1").unwrap().acknowledged);
        assert_eq!(backend.acknowledged.lock().unwrap().as_slice(), &[("a1".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_acknowledge_rolls_back_on_failure() {
        let backend = Arc::new(FakeBackend {
            fail_acknowledge: true,
            ..fleet_backend()
        });
        let service = DashboardService::new(backend, ViewSettings::default());
        let loader = service.clone();
        let view = LiveView::new("fleet", move || {
            let loader = loader.clone();
            async move { loader.load_fleet().await }
        });
        view.refresh_now().await;

        assert!(service.acknowledge(&view, "a1", true).await.is_err());
        let snapshot = view.snapshot().await.unwrap();
        assert!(!snapshot.alerts.iter().find(|a| a.id == "a1").unwrap().acknowledged);
    }
}
