//! Madio CLI - backend setup and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the shop collections
//! madio setup
//!
//! # Apply collection access rules
//! madio rules
//!
//! # Load demo categories and products
//! madio seed
//! madio seed --file my-catalog.yaml
//!
//! # Manage users
//! madio users list
//! madio users promote someone@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL` - Backend base URL (default `http://127.0.0.1:8090`)
//! - `BACKEND_SUPERUSER_EMAIL` / `BACKEND_SUPERUSER_PASSWORD` - superuser
//!   credentials, required by every command

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "madio")]
#[command(author, version, about = "Madio CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the shop collections and extend the users collection
    Setup,
    /// Apply access rules to every shop collection
    Rules,
    /// Create categories and products from a YAML file
    Seed {
        /// Seed file (defaults to the bundled demo catalog)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage shop users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List users, newest first
    List,
    /// Give a user the admin role
    Promote {
        /// Email address of the user
        email: String,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let superuser = commands::Superuser::connect().await?;

    match cli.command {
        Commands::Setup => commands::setup::run(&superuser).await?,
        Commands::Rules => commands::rules::run(&superuser).await?,
        Commands::Seed { file } => commands::seed::run(&superuser, file.as_deref()).await?,
        Commands::Users { action } => match action {
            UsersAction::List => commands::users::list(&superuser).await?,
            UsersAction::Promote { email } => commands::users::promote(&superuser, &email).await?,
        },
    }
    Ok(())
}
