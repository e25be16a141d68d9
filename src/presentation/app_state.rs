// Application state for HTTP handlers
use crate::application::account_service::AccountService;
use crate::application::dashboard_service::{ActiveView, DashboardService};
use crate::domain::user::{Credentials, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct AppState {
    pub accounts: AccountService,
    pub dashboards: DashboardService,
    /// Live view of whoever is signed in. Sign-in and sign-out hold the write
    /// lock across the session change so the two never disagree.
    active_view: RwLock<Option<Arc<ActiveView>>>,
    pub refresh_interval: Duration,
}

impl AppState {
    pub fn new(
        accounts: AccountService,
        dashboards: DashboardService,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            accounts,
            dashboards,
            active_view: RwLock::new(None),
            refresh_interval,
        }
    }

    /// The open view, released from the lock so callers can await on it.
    pub async fn current_view(&self) -> Option<Arc<ActiveView>> {
        self.active_view.read().await.clone()
    }

    /// Sign in and replace any previous live view with one for the new role.
    pub async fn sign_in(&self, credentials: &Credentials) -> anyhow::Result<UserProfile> {
        let mut active = self.active_view.write().await;
        let user = self.accounts.login(credentials).await?;
        let view = self.dashboards.open(&user, self.refresh_interval);
        if let Some(previous) = active.replace(Arc::new(view)) {
            previous.dispose();
        }
        Ok(user)
    }

    pub async fn sign_out(&self) -> Option<UserProfile> {
        let mut active = self.active_view.write().await;
        if let Some(view) = active.take() {
            view.dispose();
        }
        self.accounts.logout().await
    }
}
