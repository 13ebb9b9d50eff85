//! User accounts (plumbers and office staff).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldops_core::{is_present, require_fields, DomainResult, Entity, UserId};

use crate::{HashedPassword, Role};

/// A stored user account, including its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub password_hash: HashedPassword,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Public view of the account (never exposes the hash).
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// What the API returns for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw self-registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
}

/// A validated registration, ready to be hashed and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl Registration {
    pub fn validate(self) -> DomainResult<NewUser> {
        require_fields(&[
            ("email", is_present(&self.email)),
            ("password", self.password.as_deref().is_some_and(|p| !p.is_empty())),
            ("first_name", is_present(&self.first_name)),
            ("last_name", is_present(&self.last_name)),
        ])?;

        let role = match self.role {
            Some(r) if !r.trim().is_empty() => Role::new(r.trim().to_string()),
            _ => Role::default(),
        };

        Ok(NewUser {
            email: self.email.unwrap_or_default().trim().to_string(),
            password: self.password.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default().trim().to_string(),
            last_name: self.last_name.unwrap_or_default().trim().to_string(),
            role,
        })
    }
}

impl NewUser {
    /// Build the stored account once the password has been hashed.
    pub fn into_account(
        self,
        id: UserId,
        password_hash: HashedPassword,
        now: DateTime<Utc>,
    ) -> UserAccount {
        UserAccount {
            id,
            email: self.email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Login payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Returns `(email, password)` once both are present.
    pub fn validate(self) -> DomainResult<(String, String)> {
        require_fields(&[
            ("email", is_present(&self.email)),
            ("password", self.password.as_deref().is_some_and(|p| !p.is_empty())),
        ])?;
        Ok((
            self.email.unwrap_or_default().trim().to_string(),
            self.password.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_core::DomainError;

    fn registration() -> Registration {
        Registration {
            email: Some(" paul@example.com ".to_string()),
            password: Some("secret".to_string()),
            first_name: Some("Paul".to_string()),
            last_name: Some("Durand".to_string()),
            role: None,
        }
    }

    #[test]
    fn registration_defaults_to_plumber() {
        let user = registration().validate().unwrap();
        assert_eq!(user.role, Role::PLUMBER);
        assert_eq!(user.email, "paul@example.com");
    }

    #[test]
    fn registration_requires_names() {
        let mut r = registration();
        r.last_name = Some("  ".to_string());
        assert_eq!(
            r.validate(),
            Err(DomainError::Validation("required fields: last_name".to_string()))
        );
    }

    #[test]
    fn credentials_require_both_fields() {
        let c = Credentials {
            email: Some("a@b.c".to_string()),
            password: None,
        };
        assert!(matches!(c.validate(), Err(DomainError::Validation(_))));
    }
}
