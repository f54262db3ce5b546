//! Postgres persistence.
//!
//! ## Tables
//!
//! - `products` - catalog, including hidden entries
//! - `users` - customer accounts plus the seeded guest account
//! - `admins` - back-office principals
//! - `orders` / `order_items` - placed orders and their line snapshots
//! - `wishlists` - saved products per user
//! - `payment_methods` - masked cards per user
//! - `carts` - server-held carts keyed by session token
//!
//! Migrations live in `migrations/` and are embedded with `sqlx::migrate!`.

pub mod admins;
pub mod carts;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

pub use admins::AdminRepository;
pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use payment_methods::PaymentMethodRepository;
pub use products::ProductRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value no longer parses into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    #[error("constraint violation: {0}")]
    Conflict(String),
}

pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Unique violations become `Conflict(message)`, foreign key violations
/// `NotFound`; everything else stays a database error.
pub(crate) fn map_constraint(err: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(err)
}
