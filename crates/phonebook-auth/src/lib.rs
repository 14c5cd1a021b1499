//! Credential hashing and session tokens for the phonebook service

pub mod jwt;
pub mod password;

pub use jwt::{IssuedToken, SessionClaims, SessionTokens, TokenError, SESSION_TTL_HOURS};
pub use password::{CredentialHasher, PasswordError};
