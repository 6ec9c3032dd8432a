//! Gobble CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! gobble-cli migrate
//!
//! # Create an admin user (password from GOBBLE_ADMIN_PASSWORD or --password)
//! gobble-cli admin create -e ops@gobble.example -n "Ops Team" -r super_admin
//!
//! # Load demo restaurants, menus, coupons, and promotions
//! gobble-cli seed crates/cli/seed/demo.yaml
//! ```
//!
//! All commands read `GOBBLE_DATABASE_URL` (or `DATABASE_URL`), loading a
//! `.env` file first if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gobble-cli")]
#[command(author, version, about = "Gobble CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Admin password
        #[arg(long, env = "GOBBLE_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create_user(&email, &name, &role, password.as_deref()).await?;
            }
        },
        Commands::Seed { file } => {
            commands::seed::from_file(&file).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_admin_create_args() {
        let cli = Cli::try_parse_from([
            "gobble-cli",
            "admin",
            "create",
            "-e",
            "ops@gobble.example",
            "-n",
            "Ops",
            "-r",
            "viewer",
            "--password",
            "correct-horse",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Commands::Admin {
                action: AdminAction::Create { role, password, .. },
            } => {
                assert_eq!(role, "viewer");
                assert_eq!(password.as_deref(), Some("correct-horse"));
            }
            _ => panic!("expected admin create"),
        }
    }
}
