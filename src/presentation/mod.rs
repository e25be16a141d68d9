// Presentation layer - HTTP routes
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    acknowledge, alerts, analytics, dashboard, fleet, health_check, history, login, logout, map,
    me, refresh, register, settings,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/dashboard", get(dashboard))
        .route("/fleet", get(fleet))
        .route("/map", get(map))
        .route("/alerts", get(alerts))
        .route("/alerts/:id/acknowledge", put(acknowledge))
        .route("/analytics", get(analytics))
        .route("/history", get(history))
        .route("/settings", get(settings))
        .route("/refresh", post(refresh))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
