//! Persistence for phonebook accounts and phone numbers
//!
//! sea-orm entities, schema migrations, and the repository traits the API
//! layer talks to.

pub mod entities;
pub mod migrator;
pub mod repository;

pub use repository::{
    ListFilter, NewPhone, NewUser, Page, PhoneRepository, PhoneStore, PhoneUpdate,
    RepositoryError, UserRepository, UserStore, UserUpdate,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

/// Connect to the database at `database_url`.
///
/// Supports PostgreSQL (`postgres://...`) and SQLite (`sqlite://...`,
/// `sqlite::memory:`). In-memory SQLite is pinned to a single pooled
/// connection, since every connection would otherwise open its own database.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);

    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    debug!("Opening database connection pool");
    Database::connect(options).await
}

/// Apply all pending migrations
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrator::Migrator::up(db, None).await
}
