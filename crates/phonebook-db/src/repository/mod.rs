//! Repository traits over the two tables
//!
//! Handlers and the account service only see these traits. The sea-orm
//! implementations live in [`UserStore`] and [`PhoneStore`].

mod phones;
mod users;

pub use phones::PhoneStore;
pub use users::UserStore;

use async_trait::async_trait;
use sea_orm::{sea_query::LikeExpr, DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{phone, user};

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No row matched the lookup
    #[error("record not found")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// The row points at a parent that no longer exists
    #[error("referenced record missing: {0}")]
    MissingReference(String),

    #[error("database error: {0}")]
    Database(#[source] DbErr),
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(_) = err {
            return RepositoryError::NotFound;
        }

        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => RepositoryError::Conflict(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                RepositoryError::MissingReference(detail)
            }
            _ => RepositoryError::Database(err),
        }
    }
}

/// Fields for a new account. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub login: String,
    pub password_hash: String,
    pub age: i32,
}

/// Full replacement of an account's mutable fields
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub id: Uuid,
    pub name: String,
    pub login: String,
    pub password_hash: String,
    pub age: i32,
}

#[derive(Debug, Clone)]
pub struct NewPhone {
    pub user_id: Uuid,
    pub phone: String,
    pub description: String,
    pub is_fax: bool,
}

/// Full replacement of a phone's fields; only matches rows owned by `user_id`
#[derive(Debug, Clone)]
pub struct PhoneUpdate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone: String,
    pub description: String,
    pub is_fax: bool,
}

/// Pagination and filtering for list queries
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub offset: u64,
    pub limit: u64,
    /// Substring match (users: name, phones: number)
    pub search: Option<String>,
    /// Restrict to rows belonging to this account
    pub owner: Option<Uuid>,
}

impl ListFilter {
    /// `LIKE` pattern for the search term. `%`, `_` and `\` in the term
    /// match themselves.
    fn search_pattern(&self) -> Option<LikeExpr> {
        let term = self.search.as_deref().filter(|s| !s.is_empty())?;

        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');

        Some(LikeExpr::new(pattern).escape('\\'))
    }
}

/// One page of a list query plus the total number of matching rows
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub count: u64,
    pub items: Vec<T>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert an account and return its server-assigned ID
    async fn create(&self, user: NewUser) -> Result<Uuid, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<user::Model, RepositoryError>;

    async fn get_by_login(&self, login: &str) -> Result<user::Model, RepositoryError>;

    /// `filter.owner` restricts the listing to that account's own row
    async fn get_list(&self, filter: ListFilter) -> Result<Page<user::Model>, RepositoryError>;

    /// Returns the number of rows affected
    async fn update(&self, update: UserUpdate) -> Result<u64, RepositoryError>;

    /// Returns the number of rows affected
    async fn delete(&self, id: Uuid) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait PhoneRepository: Send + Sync {
    async fn create(&self, phone: NewPhone) -> Result<Uuid, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<phone::Model, RepositoryError>;

    async fn get_list(&self, filter: ListFilter) -> Result<Page<phone::Model>, RepositoryError>;

    async fn update(&self, update: PhoneUpdate) -> Result<u64, RepositoryError>;

    /// Delete `id` if it belongs to `user_id`
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64, RepositoryError>;
}
