//! Account service: registration, login and self-service account management
//!
//! Password hashing and verification are CPU-bound, so both run on tokio's
//! blocking pool rather than on the request's worker thread.

use std::sync::Arc;

use phonebook_auth::{CredentialHasher, IssuedToken, SessionTokens};
use phonebook_db::{
    entities::user, ListFilter, NewUser, Page, RepositoryError, UserRepository, UserUpdate,
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Minimum length, in characters, of both login and password
pub const MIN_CREDENTIAL_LEN: usize = 6;

/// Hashed once per service and verified against on unknown-login attempts
const DECOY_PASSWORD: &str = "phonebook-decoy-password";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("user already exists")]
    AlreadyExists,

    #[error("unknown login")]
    UnknownLogin,

    #[error("incorrect password")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[source] RepositoryError),

    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound | RepositoryError::MissingReference(_) => {
                AccountError::NotFound
            }
            RepositoryError::Conflict(_) => AccountError::AlreadyExists,
            other => AccountError::Storage(other),
        }
    }
}

/// Account fields as submitted by a client, password in plain text
#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub login: String,
    pub password: String,
    pub age: i32,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
    tokens: Arc<SessionTokens>,
    decoy_hash: Arc<OnceCell<String>>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: CredentialHasher,
        tokens: Arc<SessionTokens>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create an account and return it as stored.
    ///
    /// The login lookup gives a clean error for the common case; the unique
    /// index on `users.login` catches two registrations racing past it.
    pub async fn register(&self, account: NewAccount) -> Result<user::Model, AccountError> {
        validate_credentials(&account.login, &account.password)?;

        match self.users.get_by_login(&account.login).await {
            Ok(_) => return Err(AccountError::AlreadyExists),
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(AccountError::Storage(e)),
        }

        let password_hash = self.hash_password(account.password).await?;

        let id = self
            .users
            .create(NewUser {
                name: account.name,
                login: account.login,
                password_hash,
                age: account.age,
            })
            .await?;

        info!(user_id = %id, "Registered new account");

        self.fetch_existing(id).await
    }

    /// Check credentials and issue a 24 hour session token
    pub async fn login(&self, login: &str, password: &str) -> Result<IssuedToken, AccountError> {
        validate_credentials(login, password)?;

        let user = match self.users.get_by_login(login).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                debug!("Login attempt for unknown account");
                self.verify_decoy(password.to_string()).await;
                return Err(AccountError::UnknownLogin);
            }
            Err(e) => return Err(AccountError::Storage(e)),
        };

        if !self
            .verify_password(password.to_string(), user.password_hash)
            .await?
        {
            warn!(user_id = %user.id, "Login failed: incorrect password");
            return Err(AccountError::InvalidCredentials);
        }

        let issued = self
            .tokens
            .issue_session(&user.id.to_string())
            .map_err(|e| AccountError::Internal(e.to_string()))?;

        info!(user_id = %user.id, "User logged in");

        Ok(issued)
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, AccountError> {
        Ok(self.users.get_by_id(id).await?)
    }

    pub async fn list(&self, filter: ListFilter) -> Result<Page<user::Model>, AccountError> {
        Ok(self.users.get_list(filter).await?)
    }

    /// Replace every field of account `id`, re-hashing the new password
    pub async fn update(&self, id: Uuid, account: NewAccount) -> Result<user::Model, AccountError> {
        validate_credentials(&account.login, &account.password)?;

        let password_hash = self.hash_password(account.password).await?;

        let affected = self
            .users
            .update(UserUpdate {
                id,
                name: account.name,
                login: account.login,
                password_hash,
                age: account.age,
            })
            .await?;

        if affected == 0 {
            return Err(AccountError::NotFound);
        }

        info!(user_id = %id, "Updated account");

        self.fetch_existing(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AccountError> {
        if self.users.delete(id).await? == 0 {
            return Err(AccountError::NotFound);
        }

        info!(user_id = %id, "Deleted account");
        Ok(())
    }

    /// Re-read a row this service just wrote. Its absence is not the
    /// caller's fault, so it surfaces as an internal error.
    async fn fetch_existing(&self, id: Uuid) -> Result<user::Model, AccountError> {
        match self.users.get_by_id(id).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::NotFound) => Err(AccountError::Internal(format!(
                "account {} vanished after write",
                id
            ))),
            Err(e) => Err(AccountError::Storage(e)),
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AccountError> {
        let hasher = self.hasher.clone();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(|e| AccountError::Internal(e.to_string()))
    }

    /// Spend the same Argon2 work as a real verification so an unknown login
    /// cannot be told apart from a wrong password by response time
    async fn verify_decoy(&self, password: String) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hash_password(DECOY_PASSWORD.to_string()))
            .await;

        let result = match decoy {
            Ok(hash) => self.verify_password(password, hash.clone()).await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            debug!("Decoy verification failed: {}", e);
        }
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AccountError> {
        let hasher = self.hasher.clone();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AccountError::Internal(format!("verification task failed: {}", e)))?
            .map_err(|e| AccountError::Internal(e.to_string()))
    }
}

fn validate_credentials(login: &str, password: &str) -> Result<(), AccountError> {
    if login.chars().count() < MIN_CREDENTIAL_LEN || password.chars().count() < MIN_CREDENTIAL_LEN
    {
        return Err(AccountError::Validation(format!(
            "login and password must be at least {} characters",
            MIN_CREDENTIAL_LEN
        )));
    }
    Ok(())
}
