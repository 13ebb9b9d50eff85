//! HS256 bearer tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};
use crate::user::UserProfile;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Mints a bearer token for an authenticated user.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &UserProfile, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// Shared-secret HS256 validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        // Time-window checks are done by `validate_claims` so the registered
        // `exp`/`nbf` claims are not required.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Shared-secret HS256 issuer with a fixed token lifetime.
pub struct Hs256TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl Hs256TokenIssuer {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(&secret),
            ttl,
        }
    }
}

impl TokenIssuer for Hs256TokenIssuer {
    fn issue(&self, user: &UserProfile, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use fieldops_core::UserId;

    fn profile() -> UserProfile {
        let now = Utc::now();
        UserProfile {
            id: UserId::new(),
            email: "lea@example.com".to_string(),
            first_name: "Léa".to_string(),
            last_name: "Martin".to_string(),
            role: Role::ADMIN,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_round_trips_through_validator() {
        let issuer = Hs256TokenIssuer::new(b"secret".to_vec(), Duration::hours(1));
        let validator = Hs256JwtValidator::new(b"secret".to_vec());
        let user = profile();
        let now = Utc::now();

        let token = issuer.issue(&user, now).unwrap();
        let claims = validator.validate(&token, now).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::ADMIN);
        assert_eq!(claims.expires_at, now + Duration::hours(1));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let issuer = Hs256TokenIssuer::new(b"secret".to_vec(), Duration::hours(1));
        let validator = Hs256JwtValidator::new(b"other".to_vec());
        let now = Utc::now();

        let token = issuer.issue(&profile(), now).unwrap();
        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = Hs256TokenIssuer::new(b"secret".to_vec(), Duration::minutes(1));
        let validator = Hs256JwtValidator::new(b"secret".to_vec());
        let issued = Utc::now() - Duration::minutes(5);

        let token = issuer.issue(&profile(), issued).unwrap();
        assert_eq!(
            validator.validate(&token, Utc::now()),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }
}
