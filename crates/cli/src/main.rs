//! Seamline CLI - Database migrations and admin provisioning.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! seamline-cli migrate
//!
//! # Grant admin rights to an identity from the auth provider
//! seamline-cli admin grant --identity 5f0c6a9e-3b1d-4c2a-9d7e-0a1b2c3d4e5f
//!
//! # Revoke them again
//! seamline-cli admin revoke --identity 5f0c6a9e-3b1d-4c2a-9d7e-0a1b2c3d4e5f
//!
//! # List admin memberships
//! seamline-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use seamline_core::IdentityId;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "seamline-cli")]
#[command(author, version, about = "Seamline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin memberships
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Grant admin rights to an identity
    Grant {
        /// Identity id (UUID) issued by the auth provider
        #[arg(short, long)]
        identity: IdentityId,
    },
    /// Revoke admin rights from an identity
    Revoke {
        /// Identity id (UUID) issued by the auth provider
        #[arg(short, long)]
        identity: IdentityId,
    },
    /// List admin memberships
    List,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { identity } => {
                commands::admin::grant(identity).await?;
            }
            AdminAction::Revoke { identity } => commands::admin::revoke(identity).await?,
            AdminAction::List => commands::admin::list().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_grant() {
        let cli = Cli::try_parse_from([
            "seamline-cli",
            "admin",
            "grant",
            "--identity",
            "5f0c6a9e-3b1d-4c2a-9d7e-0a1b2c3d4e5f",
        ])
        .unwrap();

        match cli.command {
            Commands::Admin {
                action: AdminAction::Grant { identity },
            } => assert_eq!(identity.to_string(), "5f0c6a9e-3b1d-4c2a-9d7e-0a1b2c3d4e5f"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_identity() {
        let result = Cli::try_parse_from(["seamline-cli", "admin", "revoke", "-i", "not-a-uuid"]);
        assert!(result.is_err());
    }
}
