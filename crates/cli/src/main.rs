//! BeanVoyage CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bv-cli migrate
//!
//! # Load the built-in coffee catalog into the products table
//! bv-cli seed products
//!
//! # Give an existing account access to the admin routes
//! bv-cli admin grant -e owner@beanvoyage.coffee
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Upsert the built-in catalog
//! - `admin grant` / `admin revoke` - Toggle a profile's admin flag

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bv-cli")]
#[command(author, version, about = "BeanVoyage CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert the built-in coffee catalog
    Products,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin access to an existing profile
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke admin access
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products => {
                commands::seed::products().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::set_admin(&email, true).await?,
            AdminAction::Revoke { email } => commands::admin::set_admin(&email, false).await?,
        },
    }
    Ok(())
}
