//! Order tracker CLI - operator tools for the dashboard's access policy.
//!
//! # Usage
//!
//! ```bash
//! # Resolve an account the way the dashboard guards do
//! ordertrack-cli whois buyer@example.com
//!
//! # Show the navigation a role sees
//! ordertrack-cli nav manager
//! ```
//!
//! # Commands
//!
//! - `whois` - Look up role, status and visible navigation for an email
//! - `nav` - Print the navigation entries for a role

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ordertrack-cli")]
#[command(author, version, about = "Order tracker CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an account through the backend with the guards' retry policy
    Whois {
        /// Account email address
        email: String,

        /// Backend API base URL
        #[arg(long, env = "BACKEND_API_URL")]
        backend_url: String,

        /// Role lookups before giving up
        #[arg(long, env = "ROLE_FETCH_ATTEMPTS", default_value_t = 3)]
        attempts: u32,

        /// Wait budget for the whole lookup, in milliseconds
        #[arg(long, env = "ROLE_FETCH_TIMEOUT_MS", default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Print the navigation entries visible to a role
    Nav {
        /// Role (`buyer`, `manager` or `admin`); omit for an account without one
        role: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Whois {
            email,
            backend_url,
            attempts,
            timeout_ms,
        } => {
            commands::whois::run(
                &email,
                &backend_url,
                attempts,
                Duration::from_millis(timeout_ms),
            )
            .await?;
        }
        Commands::Nav { role } => commands::nav::run(role.as_deref())?,
    }
    Ok(())
}
