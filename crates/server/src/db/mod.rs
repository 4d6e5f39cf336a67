//! Database operations for the Dronshop `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users`, `roles`, `user_roles` - Accounts and their role assignments
//! - `categories` - Category tree (`parent_id` self-reference)
//! - `products`, `product_images`, `inventory` - Catalog and stock
//! - `orders`, `order_items` - Placed orders with price snapshots
//! - `reviews` - Product reviews awaiting or past moderation
//! - `site_settings` - Key/value storefront settings
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p dronshop-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the workspace
//! compiles without a live database.

pub mod bootstrap;
pub mod categories;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::CategoryRepository;
pub use inventory::InventoryRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use settings::SettingsRepository;
pub use users::UserRepository;

/// Errors returned by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying sqlx failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed validation when read back.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The row to update or delete does not exist.
    #[error("not found")]
    NotFound,

    /// A unique constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to `Conflict` with the given message.
    pub(crate) fn unique_or_database(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
