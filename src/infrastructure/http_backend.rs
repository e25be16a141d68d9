// REST backend client implementation
use crate::application::fleet_backend::FleetBackend;
use crate::application::session::Session;
use crate::domain::alert::{AlertCounts, AlertRecord};
use crate::domain::fleet::{Car, DriverAssignment};
use crate::domain::lenient;
use crate::domain::telemetry::{TelemetrySample, TelemetryStats};
use crate::domain::time_range::format_local_datetime;
use crate::domain::user::{Credentials, LoginGrant, Registration, UserAccount};
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Every backend response is wrapped in this.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct AcknowledgeBody {
    acknowledged: bool,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");
        match self.session.bearer().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and unwrap the envelope. `Ok(None)` means success without data.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Option<T>, BackendError> {
        let response = request.send().await.map_err(|source| BackendError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| BackendError::Transport {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("{} returned status {}", path, status));
            return Err(BackendError::Status { status, message });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|source| BackendError::Decode {
                path: path.to_string(),
                source,
            })?;
        if !envelope.success {
            return Err(BackendError::Rejected(
                envelope.message.unwrap_or_else(|| "Request failed".to_string()),
            ));
        }
        Ok(envelope.data)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, BackendError> {
        let request = self.request(Method::GET, path).await.query(query);
        self.send(request, path).await
    }

    /// Missing lists are empty lists. Records are decoded one by one so a
    /// malformed entry is dropped without losing the rest of the batch.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<Vec<T>> {
        let values: Option<Vec<serde_json::Value>> = self.get(path, query).await?;
        let items = lenient::records(values.unwrap_or_default(), path);
        tracing::debug!(path, count = items.len(), "fetched list");
        Ok(items)
    }

    /// A 404 is an absent record, not a failure.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<Option<T>> {
        match self.get(path, query).await {
            Err(BackendError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            other => Ok(other?),
        }
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, BackendError> {
        let request = self.request(Method::POST, path).await.json(body);
        self.send(request, path).await
    }
}

fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

fn range_params(start: NaiveDateTime, end: NaiveDateTime) -> Vec<(&'static str, String)> {
    vec![
        ("startTime", format_local_datetime(start)),
        ("endTime", format_local_datetime(end)),
    ]
}

#[async_trait]
impl FleetBackend for HttpBackend {
    async fn latest_telemetry_all(&self) -> anyhow::Result<Vec<TelemetrySample>> {
        self.get_list("/telemetry/latest/all", &[]).await
    }

    async fn all_telemetry(&self) -> anyhow::Result<Vec<TelemetrySample>> {
        self.get_list("/telemetry", &[]).await
    }

    async fn latest_telemetry(&self, car_id: &str) -> anyhow::Result<Vec<TelemetrySample>> {
        self.get_list(&format!("/telemetry/car/{}/latest", segment(car_id)), &[])
            .await
    }

    async fn telemetry_range(
        &self,
        car_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<TelemetrySample>> {
        self.get_list(
            &format!("/telemetry/car/{}/range", segment(car_id)),
            &range_params(start, end),
        )
        .await
    }

    async fn telemetry_history(&self, car_id: &str) -> anyhow::Result<Vec<TelemetrySample>> {
        self.get_list(&format!("/telemetry/car/{}", segment(car_id)), &[])
            .await
    }

    async fn telemetry_stats(
        &self,
        car_id: &str,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> anyhow::Result<Option<TelemetryStats>> {
        let params = range
            .map(|(start, end)| range_params(start, end))
            .unwrap_or_default();
        self.get_optional(&format!("/telemetry/stats/car/{}", segment(car_id)), &params)
            .await
    }

    async fn alerts(&self) -> anyhow::Result<Vec<AlertRecord>> {
        self.get_list("/alerts", &[]).await
    }

    async fn car_alerts(&self, car_id: &str) -> anyhow::Result<Vec<AlertRecord>> {
        self.get_list(&format!("/alerts/car/{}", segment(car_id)), &[])
            .await
    }

    async fn alert_counts(&self) -> anyhow::Result<AlertCounts> {
        let counts: Option<AlertCounts> = self.get("/alerts/stats/count", &[]).await?;
        Ok(counts.unwrap_or_default())
    }

    async fn set_acknowledged(&self, alert_id: &str, acknowledged: bool) -> anyhow::Result<()> {
        let path = format!("/alerts/{}/acknowledge", segment(alert_id));
        let request = self
            .request(Method::PUT, &path)
            .await
            .json(&AcknowledgeBody { acknowledged });
        self.send::<serde_json::Value>(request, &path).await?;
        Ok(())
    }

    async fn cars(&self) -> anyhow::Result<Vec<Car>> {
        self.get_list("/cars", &[]).await
    }

    async fn car(&self, car_id: &str) -> anyhow::Result<Option<Car>> {
        self.get_optional(&format!("/cars/{}", segment(car_id)), &[])
            .await
    }

    async fn assigned_drivers(&self) -> anyhow::Result<Vec<DriverAssignment>> {
        self.get_list("/drivers/assigned", &[]).await
    }

    async fn driver_for_user(&self, user_id: &str) -> anyhow::Result<Option<DriverAssignment>> {
        self.get_optional(&format!("/drivers/user/{}", segment(user_id)), &[])
            .await
    }

    async fn users(&self) -> anyhow::Result<Vec<UserAccount>> {
        self.get_list("/users", &[]).await
    }

    async fn login(&self, credentials: &Credentials) -> anyhow::Result<LoginGrant> {
        let grant: Option<LoginGrant> = self.post("/users/login", credentials).await?;
        Ok(grant.ok_or_else(|| BackendError::Rejected("Login failed".to_string()))?)
    }

    async fn register(&self, registration: &Registration) -> anyhow::Result<UserAccount> {
        let account: Option<UserAccount> = self.post("/users/register", registration).await?;
        Ok(account.ok_or_else(|| BackendError::Rejected("Registration failed".to_string()))?)
    }
}
