//! Database migration command.
//!
//! Applies `crates/server/migrations/` in order. Already-applied migrations
//! are skipped, so running it twice is harmless.

use super::{CommandError, connect};

/// Run all pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
