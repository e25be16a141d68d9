// Explicit session context for backend calls
use crate::domain::user::{LoginGrant, UserProfile};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Active {
    token: Option<String>,
    user: UserProfile,
}

/// Session state shared by whatever issues backend calls.
///
/// Starts empty; `begin` on login, `end` on logout.
#[derive(Debug, Default)]
pub struct Session {
    active: RwLock<Option<Active>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self, grant: &LoginGrant) -> UserProfile {
        let user = grant.profile();
        let token = grant.token.clone().filter(|t| !t.is_empty());
        *self.active.write().await = Some(Active {
            token,
            user: user.clone(),
        });
        tracing::info!(user = %user.username, role = ?user.role, "session started");
        user
    }

    pub async fn end(&self) -> Option<UserProfile> {
        let ended = self.active.write().await.take().map(|a| a.user);
        if let Some(user) = &ended {
            tracing::info!(user = %user.username, "session ended");
        }
        ended
    }

    pub async fn bearer(&self) -> Option<String> {
        self.active.read().await.as_ref().and_then(|a| a.token.clone())
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.active.read().await.as_ref().map(|a| a.user.clone())
    }
}
