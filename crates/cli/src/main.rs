//! Dronshop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply SQL migrations
//! dronshop-cli migrate
//!
//! # Load categories, products and stock from YAML (idempotent)
//! dronshop-cli seed catalog crates/server/seed/demo_catalog.yaml
//!
//! # Create an admin, or promote an existing user
//! dronshop-cli admin create --phone +79990001122 --name "Store Admin"
//! ```
//!
//! Every command reads `DRONSHOP_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dronshop-cli")]
#[command(author, version, about = "Dronshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Categories, products and stock levels from a YAML file
    Catalog {
        /// Path to the catalog YAML
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin by phone, or grant `admin` to the existing user
    Create {
        /// Phone number in international format
        #[arg(short, long)]
        phone: String,

        /// Display name for a new user
        #[arg(short, long)]
        name: Option<String>,

        /// Email for a new user
        #[arg(short, long)]
        email: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => {
                commands::seed::catalog(&file).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { phone, name, email } => {
                commands::admin::create(&phone, name.as_deref(), email.as_deref()).await?;
            }
        },
    }
    Ok(())
}
