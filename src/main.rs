// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::account_service::AccountService;
use crate::application::dashboard_service::DashboardService;
use crate::application::fleet_backend::FleetBackend;
use crate::application::session::Session;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_backend::HttpBackend;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create backend client (infrastructure layer)
    let session = Arc::new(Session::new());
    let backend: Arc<dyn FleetBackend> = Arc::new(HttpBackend::new(
        &config.backend.base_url,
        config.backend.timeout(),
        session.clone(),
    )?);

    // Create services (application layer)
    let accounts = AccountService::new(backend.clone(), session);
    let dashboards = DashboardService::new(backend, config.view_settings());

    // Create application state
    let state = Arc::new(AppState::new(accounts, dashboards, config.refresh.interval()));

    if let Some(credentials) = config.backend.credentials() {
        match state.sign_in(&credentials).await {
            Ok(user) => tracing::info!(user = %user.username, "signed in from configuration"),
            Err(e) => tracing::warn!("configured sign-in failed: {:#}", e),
        }
    }

    // Build router (presentation layer)
    let router = presentation::router(state.clone());

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, backend = %config.backend.base_url, "starting fleet-telemetry service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    state.sign_out().await;
    Ok(())
}
