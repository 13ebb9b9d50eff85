//! `fieldops-auth`: authentication boundary.
//!
//! Password hashing, bearer-token claims and their HS256 encoding, and the user
//! account model. This crate is decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod roles;
pub mod user;

pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, Hs256TokenIssuer, JwtValidator, TokenError, TokenIssuer};
pub use password::{hash_password, verify_password, HashedPassword, PasswordError};
pub use roles::Role;
pub use user::{Credentials, NewUser, Registration, UserAccount, UserProfile};
