//! Atelier CLI - database migrations and cart inspection.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! atelier migrate
//!
//! # Show a signed-in user's cart, priced against the catalog
//! atelier cart show --user 8f2c1d
//!
//! # Empty a signed-in user's cart
//! atelier cart clear --user 8f2c1d
//!
//! # List active catalog products
//! atelier catalog list
//! ```
//!
//! # Environment Variables
//!
//! - `ATELIER_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `RUST_LOG` - log filter, defaults to `atelier_cli=info,atelier_storefront=info`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Atelier storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Inspect or reset a signed-in user's cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Inspect the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart lines and summary
    Show {
        /// Profile user ID
        #[arg(short, long)]
        user: String,
    },
    /// Replace the cart with an empty list
    Clear {
        /// Profile user ID
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List active products
    List,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("atelier_cli=info,atelier_storefront=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Cart { action } => match action {
            CartAction::Show { user } => commands::cart::show(&user.into()).await?,
            CartAction::Clear { user } => commands::cart::clear(&user.into()).await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list().await?,
        },
    }
    Ok(())
}
