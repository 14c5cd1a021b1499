//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),

    /// Work factor outside the ranges Argon2 accepts
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),
}

/// Argon2id hasher with a fixed work factor.
///
/// The work factor only applies to new hashes. Verification reads the
/// parameters embedded in the stored PHC string, so raising the cost later
/// never invalidates existing hashes.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    /// OWASP-recommended defaults: 19 MiB memory, 2 iterations, 1 lane.
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Build a hasher from raw cost values (memory in KiB).
    pub fn from_costs(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh 16-byte salt.
    ///
    /// # Returns
    /// * `Ok(String)` - PHC-formatted hash string (suitable for storage)
    /// * `Err(PasswordError)` - If hashing fails
    ///
    /// # Example
    /// ```
    /// use phonebook_auth::CredentialHasher;
    ///
    /// let hasher = CredentialHasher::from_costs(1024, 1, 1).unwrap();
    /// let hash = hasher.hash("secret1").unwrap();
    /// assert!(hash.starts_with("$argon2id$"));
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a password against a stored hash
    ///
    /// # Returns
    /// * `Ok(true)` - Password matches hash
    /// * `Ok(false)` - Password does not match hash
    /// * `Err(PasswordError)` - If hash format is invalid or verification fails
    ///
    /// # Example
    /// ```
    /// use phonebook_auth::CredentialHasher;
    ///
    /// let hasher = CredentialHasher::from_costs(1024, 1, 1).unwrap();
    /// let hash = hasher.hash("secret1").unwrap();
    /// assert!(hasher.verify("secret1", &hash).unwrap());
    /// assert!(!hasher.verify("secret2", &hash).unwrap());
    /// ```
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}
