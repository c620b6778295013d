//! Organic Market CLI - inspect and drive member state against the live
//! document store.
//!
//! # Usage
//!
//! ```bash
//! # Show the active role of a member
//! om-cli role --member m1
//!
//! # List or toggle favorited products
//! om-cli wishlist list --member m1
//! om-cli wishlist toggle --member m1 --product p42
//!
//! # List notifications visible to a member
//! om-cli notifications list --member m1 --unread
//! ```
//!
//! # Environment Variables
//!
//! - `DOCSTORE_BASE_URL` - Base URL of the document store (required)
//! - `DOCSTORE_API_KEY` - Bearer token for the document store
//! - `SENTRY_DSN` - Enables error reporting when set

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use organic_market_sync::{AppContext, SyncConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "om-cli")]
#[command(author, version, about = "Organic Market CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the active role of a member
    Role {
        /// Member ID
        #[arg(short, long)]
        member: String,
    },
    /// Inspect or change a member's wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Inspect a member's notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List favorited products
    List {
        /// Member ID
        #[arg(short, long)]
        member: String,
    },
    /// Favorite or unfavorite a product
    Toggle {
        /// Member ID
        #[arg(short, long)]
        member: String,

        /// Product ID
        #[arg(short, long)]
        product: String,
    },
}

#[derive(Subcommand)]
enum NotificationsAction {
    /// List notifications, broadcasts included
    List {
        /// Member ID
        #[arg(short, long)]
        member: String,

        /// Only show unread notifications
        #[arg(short, long)]
        unread: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialised before the tracing subscriber
    let config = SyncConfig::from_env().expect("Failed to load configuration");
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "organic_market_sync=info,om_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let context = AppContext::from_config(config)?;

    match cli.command {
        Commands::Role { member } => commands::role::show(&context, &member.into()).await?,
        Commands::Wishlist { action } => match action {
            WishlistAction::List { member } => {
                commands::wishlist::list(&context, &member.into()).await?;
            }
            WishlistAction::Toggle { member, product } => {
                commands::wishlist::toggle(&context, &member.into(), &product.into()).await?;
            }
        },
        Commands::Notifications { action } => match action {
            NotificationsAction::List { member, unread } => {
                commands::notifications::list(&context, &member.into(), unread).await?;
            }
        },
    }
    Ok(())
}
