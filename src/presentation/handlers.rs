// HTTP request handlers
use crate::application::account_service::AccountError;
use crate::application::dashboard_service::{ActiveView, DriverSnapshot, FleetSnapshot};
use crate::application::listing::CategoryFilter;
use crate::application::refresh::ViewState;
use crate::application::views::{self, AlertQuery, CarOption};
use crate::domain::time_range::TimeRange;
use crate::domain::user::{AccessDenied, Capability, Credentials, Registration, Role, UserProfile};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not signed in")]
    Unauthorized,
    #[error("{0}")]
    LoginFailed(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("{0}")]
    Backend(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::LoginFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// A live view as the client sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Live<V> {
    pub loading: bool,
    pub last_updated: Option<NaiveDateTime>,
    /// None until the first fetch succeeds.
    pub view: Option<V>,
}

impl<V> Live<V> {
    fn from_state<S>(state: ViewState<S>, build: impl FnOnce(&S) -> V) -> Self {
        Self {
            loading: state.loading,
            last_updated: state.last_updated,
            view: state.snapshot.as_ref().map(build),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AlertsParams {
    pub search: Option<String>,
    pub severity: Option<String>,
    pub car: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsParams {
    pub vehicle: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
    pub car: Option<String>,
    pub range: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeBody {
    pub acknowledged: bool,
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

async fn signed_in(state: &AppState) -> Result<UserProfile, ApiError> {
    state.accounts.current_user().await.ok_or(ApiError::Unauthorized)
}

async fn fleet_state(state: &AppState) -> ViewState<FleetSnapshot> {
    match state.current_view().await.as_deref() {
        Some(ActiveView::Fleet(view)) => view.state().await,
        _ => ViewState::default(),
    }
}

async fn driver_state(state: &AppState) -> ViewState<DriverSnapshot> {
    match state.current_view().await.as_deref() {
        Some(ActiveView::Driver(view)) => view.state().await,
        _ => ViewState::default(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<UserProfile>, ApiError> {
    match state.sign_in(&credentials).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => {
            tracing::info!(username = %credentials.username, "login rejected: {:#}", e);
            Err(ApiError::LoginFailed(e.to_string()))
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sign_out().await;
    StatusCode::NO_CONTENT
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<Registration>,
) -> Result<impl IntoResponse, ApiError> {
    match state.accounts.register(&registration).await {
        Ok(account) => Ok((StatusCode::CREATED, Json(account))),
        Err(AccountError::Invalid(e)) => Err(ApiError::BadRequest(e.to_string())),
        Err(AccountError::Backend(e)) => {
            tracing::warn!("registration failed: {:#}", e);
            Err(ApiError::Backend(e.to_string()))
        }
    }
}

pub async fn me(State(state): State<Arc<AppState>>) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(signed_in(&state).await?))
}

/// Role home page: fleet overview for admins, own vehicle for drivers.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let user = signed_in(&state).await?;
    match user.role {
        Role::Admin => fleet_overview(&state, &user, &query)
            .await
            .map(IntoResponse::into_response),
        Role::Driver => {
            user.require(Capability::ViewOwnVehicle)?;
            let now = now();
            let live = Live::from_state(driver_state(&state).await, |s| {
                views::driver_dashboard(s, now)
            });
            Ok(Json(live).into_response())
        }
    }
}

pub async fn fleet(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = signed_in(&state).await?;
    fleet_overview(&state, &user, &query).await
}

async fn fleet_overview(
    state: &AppState,
    user: &UserProfile,
    query: &SearchQuery,
) -> Result<Json<Live<views::AdminDashboardView>>, ApiError> {
    user.require(Capability::ViewFleet)?;
    let search = query.search.as_deref().unwrap_or("");
    Ok(Json(Live::from_state(fleet_state(state).await, |s| {
        views::admin_dashboard(s, search)
    })))
}

pub async fn map(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Live<views::MapView>>, ApiError> {
    let user = signed_in(&state).await?;
    let live = match user.role {
        Role::Admin => {
            user.require(Capability::ViewFleet)?;
            Live::from_state(fleet_state(&state).await, views::fleet_map)
        }
        Role::Driver => {
            user.require(Capability::ViewOwnVehicle)?;
            Live::from_state(driver_state(&state).await, views::driver_map)
        }
    };
    Ok(Json(live))
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertsParams>,
) -> Result<Json<Live<views::AlertsView>>, ApiError> {
    let user = signed_in(&state).await?;
    let page_size = state.dashboards.settings().alerts_page_size;
    let mut query = AlertQuery {
        search: params.search.unwrap_or_default(),
        severity: CategoryFilter::parse(params.severity.as_deref()),
        car: CategoryFilter::parse(params.car.as_deref()),
        page: params.page.unwrap_or(1),
    };

    let live = match user.role {
        Role::Admin => {
            user.require(Capability::ViewFleet)?;
            Live::from_state(fleet_state(&state).await, |s| {
                views::alerts_view(&s.alerts, &s.cars, &query, page_size)
            })
        }
        Role::Driver => {
            user.require(Capability::ViewOwnVehicle)?;
            query.car = CategoryFilter::All;
            Live::from_state(driver_state(&state).await, |s| {
                let mut view = views::alerts_view(&s.alerts, &[], &query, page_size);
                view.cars = s
                    .car
                    .iter()
                    .map(|c| CarOption {
                        id: c.id.clone(),
                        label: c.label(),
                    })
                    .collect();
                view
            })
        }
    };
    Ok(Json(live))
}

pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
    Json(body): Json<AcknowledgeBody>,
) -> Result<StatusCode, ApiError> {
    let user = signed_in(&state).await?;
    user.require(Capability::AcknowledgeAlerts)?;

    let active = state.current_view().await;
    let Some(ActiveView::Fleet(view)) = active.as_deref() else {
        return Err(ApiError::BadRequest("No fleet view is open".to_string()));
    };
    state
        .dashboards
        .acknowledge(view, &alert_id, body.acknowledged)
        .await
        .map_err(|e| ApiError::Backend(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<views::AnalyticsView>, ApiError> {
    let user = signed_in(&state).await?;
    user.require(Capability::ViewFleet)?;

    let now = now();
    let range = params
        .range
        .as_deref()
        .map(TimeRange::parse)
        .unwrap_or(TimeRange::Last7Days);
    let snapshot = state.dashboards.load_analytics(now).await.unwrap_or_else(|e| {
        tracing::warn!("analytics fetch failed: {:#}", e);
        Default::default()
    });
    let vehicle = CategoryFilter::parse(params.vehicle.as_deref());
    Ok(Json(views::analytics(&snapshot, &vehicle, range, now)))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Option<views::HistoryView>>, ApiError> {
    let user = signed_in(&state).await?;
    let car_id = match user.role {
        Role::Admin => {
            user.require(Capability::ViewFleet)?;
            let car = params.car.clone().filter(|c| !c.is_empty());
            Some(car.ok_or_else(|| ApiError::BadRequest("car is required".to_string()))?)
        }
        Role::Driver => {
            user.require(Capability::ViewOwnVehicle)?;
            match driver_state(&state).await.snapshot {
                Some(snapshot) => snapshot.car_id().map(str::to_string),
                None => state
                    .dashboards
                    .load_driver(&user.id, now())
                    .await
                    .ok()
                    .and_then(|s| s.car_id().map(str::to_string)),
            }
        }
    };
    let Some(car_id) = car_id else {
        return Ok(Json(None));
    };

    let range = params
        .range
        .as_deref()
        .map(TimeRange::parse)
        .unwrap_or(TimeRange::Last24Hours);
    let snapshot = state
        .dashboards
        .load_history(&car_id, range, now())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(car_id = %car_id, "history fetch failed: {:#}", e);
            Default::default()
        });
    let page_size = state.dashboards.settings().history_page_size;
    Ok(Json(Some(views::history(
        &car_id,
        range,
        &snapshot,
        params.page.unwrap_or(1),
        page_size,
    ))))
}

pub async fn settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<views::SettingsView>, ApiError> {
    let user = signed_in(&state).await?;
    user.require(Capability::ManageUsers)?;

    let snapshot = state.dashboards.load_settings().await.unwrap_or_else(|e| {
        tracing::warn!("settings fetch failed: {:#}", e);
        Default::default()
    });
    Ok(Json(views::settings(&snapshot)))
}

/// Fetch the live view now instead of waiting for the next tick.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    signed_in(&state).await?;
    let applied = match state.current_view().await {
        Some(view) => view.refresh_now().await,
        None => false,
    };
    Ok(Json(json!({ "applied": applied })))
}
