// Repository trait for the fleet REST backend
use crate::domain::alert::{AlertCounts, AlertRecord};
use crate::domain::fleet::{Car, DriverAssignment};
use crate::domain::telemetry::{TelemetrySample, TelemetryStats};
use crate::domain::user::{Credentials, LoginGrant, Registration, UserAccount};
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[async_trait]
pub trait FleetBackend: Send + Sync {
    /// Latest sample of every car
    async fn latest_telemetry_all(&self) -> anyhow::Result<Vec<TelemetrySample>>;

    /// Every sample the backend holds
    async fn all_telemetry(&self) -> anyhow::Result<Vec<TelemetrySample>>;

    /// Latest sample(s) of one car, newest first
    async fn latest_telemetry(&self, car_id: &str) -> anyhow::Result<Vec<TelemetrySample>>;

    /// Samples of one car between two local instants
    async fn telemetry_range(
        &self,
        car_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<TelemetrySample>>;

    /// Unbounded history of one car
    async fn telemetry_history(&self, car_id: &str) -> anyhow::Result<Vec<TelemetrySample>>;

    /// Backend-computed statistics; `None` range means all time
    async fn telemetry_stats(
        &self,
        car_id: &str,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> anyhow::Result<Option<TelemetryStats>>;

    async fn alerts(&self) -> anyhow::Result<Vec<AlertRecord>>;

    async fn car_alerts(&self, car_id: &str) -> anyhow::Result<Vec<AlertRecord>>;

    async fn alert_counts(&self) -> anyhow::Result<AlertCounts>;

    async fn set_acknowledged(&self, alert_id: &str, acknowledged: bool) -> anyhow::Result<()>;

    async fn cars(&self) -> anyhow::Result<Vec<Car>>;

    async fn car(&self, car_id: &str) -> anyhow::Result<Option<Car>>;

    async fn assigned_drivers(&self) -> anyhow::Result<Vec<DriverAssignment>>;

    async fn driver_for_user(&self, user_id: &str) -> anyhow::Result<Option<DriverAssignment>>;

    async fn users(&self) -> anyhow::Result<Vec<UserAccount>>;

    async fn login(&self, credentials: &Credentials) -> anyhow::Result<LoginGrant>;

    async fn register(&self, registration: &Registration) -> anyhow::Result<UserAccount>;
}
