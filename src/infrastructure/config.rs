use crate::application::classifier::Thresholds;
use crate::application::correlation::{RECENT_ALERTS, WINDOW_MARGIN_MINUTES};
use crate::application::dashboard_service::ViewSettings;
use crate::application::refresh::DEFAULT_REFRESH_INTERVAL;
use crate::domain::user::Credentials;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub listing: ListingSettings,
    #[serde(default)]
    pub correlation: CorrelationSettings,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Signs in at startup when both are set.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081/api".to_string(),
            timeout_secs: 10,
            username: None,
            password: None,
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            username: self.username.clone()?,
            password: self.password.clone()?,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshSettings {
    pub interval_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
        }
    }
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListingSettings {
    pub alerts_page_size: usize,
    pub history_page_size: usize,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            alerts_page_size: 10,
            history_page_size: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorrelationSettings {
    pub recent_alerts: usize,
    pub window_minutes: i64,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            recent_alerts: RECENT_ALERTS,
            window_minutes: WINDOW_MARGIN_MINUTES,
        }
    }
}

impl AppConfig {
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            alerts_page_size: self.listing.alerts_page_size.max(1),
            history_page_size: self.listing.history_page_size.max(1),
            recent_alerts: self.correlation.recent_alerts,
            window_margin: chrono::Duration::minutes(self.correlation.window_minutes.max(0)),
            thresholds: self.thresholds,
        }
    }
}

/// `config/fleet.toml` if present, overridden by `FLEET__SECTION__KEY`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/fleet").required(false))
        .add_source(config::Environment::with_prefix("FLEET").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
