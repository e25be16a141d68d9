// Account service - sign-in, sign-out and registration
use crate::application::fleet_backend::FleetBackend;
use crate::application::session::Session;
use crate::domain::user::{Credentials, Registration, RegistrationError, UserAccount, UserProfile};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Invalid(#[from] RegistrationError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct AccountService {
    backend: Arc<dyn FleetBackend>,
    session: Arc<Session>,
}

impl AccountService {
    pub fn new(backend: Arc<dyn FleetBackend>, session: Arc<Session>) -> Self {
        Self { backend, session }
    }

    /// Authenticate and make the grant the current session.
    pub async fn login(&self, credentials: &Credentials) -> anyhow::Result<UserProfile> {
        let grant = self.backend.login(credentials).await?;
        Ok(self.session.begin(&grant).await)
    }

    pub async fn logout(&self) -> Option<UserProfile> {
        self.session.end().await
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.session.user().await
    }

    /// Local validation first; the backend is only called for a valid form.
    pub async fn register(&self, registration: &Registration) -> Result<UserAccount, AccountError> {
        registration.validate()?;
        let account = self.backend.register(registration).await?;
        tracing::info!(username = %registration.username, "account registered");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::tests::FakeBackend;
    use crate::domain::user::Role;

    fn service() -> (AccountService, Arc<Session>) {
        let session = Arc::new(Session::new());
        let service = AccountService::new(Arc::new(FakeBackend::default()), session.clone());
        (service, session)
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_login_begins_session() {
        let (service, session) = service();
        let user = service.login(&credentials("admin", "secret1")).await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(session.bearer().await.as_deref(), Some("token-admin"));

        assert_eq!(service.logout().await.map(|u| u.username), Some("admin".to_string()));
        assert!(service.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_empty() {
        let (service, session) = service();
        let err = service.login(&credentials("admin", "nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(session.user().await.is_none());
    }

    #[tokio::test]
    async fn test_register_validates_first() {
        let (service, _) = service();
        let mut registration = Registration {
            username: "jd".into(),
            password: "secret1".into(),
            role: Role::Driver,
            name: "John Doe".into(),
            age: 30,
            gender: None,
            contact_number: "555-0100".into(),
            email: "jdoe@example.com".into(),
            license_number: "DL-1".into(),
        };

        let err = service.register(&registration).await.unwrap_err();
        assert!(matches!(err, AccountError::Invalid(RegistrationError::UsernameTooShort)));

        registration.username = "jdoe".into();
        let account = service.register(&registration).await.unwrap();
        assert_eq!(account.username.as_deref(), Some("jdoe"));
    }
}
