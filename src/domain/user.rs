// User, role and registration models
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Driver,
}

/// Things a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewFleet,
    ViewOwnVehicle,
    AcknowledgeAlerts,
    ManageUsers,
}

impl Role {
    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Role::Admin => !matches!(capability, Capability::ViewOwnVehicle),
            Role::Driver => matches!(capability, Capability::ViewOwnVehicle),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{role:?} is not allowed to {capability:?}")]
pub struct AccessDenied {
    pub role: Role,
    pub capability: Capability,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: Option<String>,
}

impl UserProfile {
    pub fn require(&self, capability: Capability) -> Result<(), AccessDenied> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(AccessDenied {
                role: self.role,
                capability,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Payload of a successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(deserialize_with = "lenient::required_identifier")]
    pub user_id: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
}

impl LoginGrant {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.user_id.clone(),
            username: self.username.clone(),
            role: self.role,
            name: self.name.clone(),
        }
    }
}

/// A user account as listed for administrators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(deserialize_with = "lenient::required_identifier")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, alias = "assigned_car_id", deserialize_with = "lenient::identifier")]
    pub assigned_car_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub gender: Option<String>,
    pub contact_number: String,
    pub email: String,
    pub license_number: String,
}

fn default_role() -> Role {
    Role::Driver
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Name is required")]
    MissingName,
    #[error("Age must be at least 18")]
    Underage,
    #[error("Contact number is required")]
    MissingContactNumber,
    #[error("Email is required")]
    MissingEmail,
    #[error("License number is required")]
    MissingLicenseNumber,
}

impl Registration {
    /// Checks run in form order; the first failure wins.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.username.chars().count() < 3 {
            return Err(RegistrationError::UsernameTooShort);
        }
        if self.password.chars().count() < 6 {
            return Err(RegistrationError::PasswordTooShort);
        }
        if self.name.trim().is_empty() {
            return Err(RegistrationError::MissingName);
        }
        if self.age < 18 {
            return Err(RegistrationError::Underage);
        }
        if self.contact_number.trim().is_empty() {
            return Err(RegistrationError::MissingContactNumber);
        }
        if self.email.trim().is_empty() {
            return Err(RegistrationError::MissingEmail);
        }
        if self.license_number.trim().is_empty() {
            return Err(RegistrationError::MissingLicenseNumber);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "jdoe".into(),
            password: "secret1".into(),
            role: Role::Driver,
            name: "John Doe".into(),
            age: 25,
            gender: Some("MALE".into()),
            contact_number: "555-0100".into(),
            email: "jdoe@example.com".into(),
            license_number: "DL-1234".into(),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert_eq!(registration().validate(), Ok(()));
    }

    #[test]
    fn test_registration_rules() {
        let mut r = registration();
        r.username = "jd".into();
        assert_eq!(r.validate(), Err(RegistrationError::UsernameTooShort));

        let mut r = registration();
        r.password = "12345".into();
        assert_eq!(r.validate(), Err(RegistrationError::PasswordTooShort));

        let mut r = registration();
        r.age = 17;
        assert_eq!(r.validate(), Err(RegistrationError::Underage));

        let mut r = registration();
        r.license_number = " ".into();
        assert_eq!(r.validate(), Err(RegistrationError::MissingLicenseNumber));
    }

    #[test]
    fn test_role_capabilities() {
        let admin = UserProfile {
            id: "1".into(),
            username: "admin".into(),
            role: Role::Admin,
            name: None,
        };
        let driver = UserProfile { role: Role::Driver, ..admin.clone() };

        assert!(admin.require(Capability::AcknowledgeAlerts).is_ok());
        assert!(admin.require(Capability::ViewOwnVehicle).is_err());
        assert!(driver.require(Capability::ViewOwnVehicle).is_ok());
        assert_eq!(
            driver.require(Capability::ManageUsers),
            Err(AccessDenied { role: Role::Driver, capability: Capability::ManageUsers })
        );
    }
}
