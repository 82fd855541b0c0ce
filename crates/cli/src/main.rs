//! Blossom CLI - browse the storefront and manage the local session.
//!
//! # Usage
//!
//! ```bash
//! # Show session state
//! blossom session status
//!
//! # Browse the catalog
//! blossom products --search peony --in-stock
//! blossom product peony-bouquet
//!
//! # Manage the local cart
//! blossom cart add peony-bouquet -q 2
//! blossom cart show
//!
//! # Favorites
//! blossom favorites toggle peony-bouquet
//! blossom favorites sync
//! ```
//!
//! # Environment Variables
//!
//! - `BLOSSOM_API_BASE_URL` - Base URL of the remote API (required)
//! - `BLOSSOM_STATE_DIR` - Where session/cart/favorites state lives
//! - `TELEGRAM_INIT_DATA` - Host identity assertion for first login

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use blossom_client::{ClientConfig, ShopClient};

mod commands;

#[derive(Parser)]
#[command(name = "blossom")]
#[command(author, version, about = "Blossom storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or manage the session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Browse the catalog
    Products {
        /// Restrict to one category slug
        #[arg(short, long)]
        category: Option<String>,
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,
        /// Only products with stock remaining
        #[arg(long)]
        in_stock: bool,
        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Show one product
    Product {
        /// Product slug
        slug: String,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// List your orders
    Orders,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the current session state and identity
    Status,
    /// Authenticate (cached credential or host identity)
    Login,
    /// Clear the session and persisted credential
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a product by slug
    Add {
        slug: String,
        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a line by product id
    Remove { product_id: i64 },
    /// Empty the cart and drop the promo
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Show the local favorites set
    Show,
    /// Flip membership for a product by slug
    Toggle { slug: String },
    /// Reconcile with the server
    Sync,
}

#[tokio::main]
async fn main() {
    // Initialize tracing with EnvFilter; default to info for our crates
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blossom_client=info,blossom=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let client = ShopClient::new(&config);

    // Settle the session first; every path below may need credentials.
    // Logout skips it - tearing down doesn't warrant a login exchange.
    if !matches!(
        &cli.command,
        Commands::Session {
            action: SessionAction::Logout
        }
    ) {
        client.init().await;
    }

    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::Status => commands::session::status(&client),
            SessionAction::Login => commands::session::login(&client),
            SessionAction::Logout => commands::session::logout(&client),
        },
        Commands::Products {
            category,
            search,
            in_stock,
            page,
        } => commands::catalog::list_products(&client, category, search, in_stock, page).await?,
        Commands::Product { slug } => commands::catalog::show_product(&client, &slug).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&client),
            CartAction::Add { slug, quantity } => {
                commands::cart::add(&client, &slug, quantity).await?;
            }
            CartAction::Remove { product_id } => commands::cart::remove(&client, product_id),
            CartAction::Clear => commands::cart::clear(&client),
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::Show => commands::favorites::show(&client),
            FavoritesAction::Toggle { slug } => {
                commands::favorites::toggle(&client, &slug).await?;
            }
            FavoritesAction::Sync => commands::favorites::sync(&client).await?,
        },
        Commands::Orders => commands::orders::list(&client).await?,
    }
    Ok(())
}
