//! Shelfwise CLI - Database migrations and support tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shelfwise-cli migrate
//!
//! # Print the subscription tier catalog
//! shelfwise-cli tiers
//!
//! # Show a shop's usage for the current month
//! shelfwise-cli usage --shop example.myshopify.com
//!
//! # Lift a shop's anti-churn lockout (trial flag is kept)
//! shelfwise-cli unlock --shop example.myshopify.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `tiers` - Print the tier catalog
//! - `usage` - Current-period usage counters of a shop
//! - `unlock` - Clear a shop's anti-churn lockout

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shelfwise-cli")]
#[command(author, version, about = "Shelfwise CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print the subscription tier catalog
    Tiers,
    /// Show a shop's usage counters for the current month
    Usage {
        /// Shop domain, e.g. example.myshopify.com
        #[arg(short, long)]
        shop: String,
    },
    /// Clear a shop's anti-churn lockout
    Unlock {
        /// Shop domain, e.g. example.myshopify.com
        #[arg(short, long)]
        shop: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tiers => commands::shops::tiers(),
        Commands::Usage { shop } => commands::shops::usage(&shop).await?,
        Commands::Unlock { shop } => commands::shops::unlock(&shop).await?,
    }
    Ok(())
}
