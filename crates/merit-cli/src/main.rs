//! merit — operator CLI for the loyalty/airdrop claims backend.
//!
//! Runs every service operation against a local database: event and product
//! management, order lifecycle, check-ins, batch commitment, and claim
//! tickets. Operator commands dispatch under the operator identity; wallet
//! commands supply the wallet identity they read for.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use merit_core::crypto::sign::TicketSigner;
use merit_service::config::ServiceConfig;
use merit_service::store::SqliteStore;
use merit_service::ServiceContext;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// Environment variable carrying the hex signing-key seed.
const SIGNING_KEY_ENV: &str = "MERIT_SIGNING_KEY";

/// merit — loyalty/airdrop claims backend
#[derive(Parser, Debug)]
#[command(name = "merit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the service configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a signing keypair for the authorization signer
    Keygen,

    /// Event management
    #[command(subcommand)]
    Event(commands::loyalty::EventCommand),

    /// Record a check-in for a wallet
    Checkin(commands::loyalty::CheckinArgs),

    /// Fetch a wallet's airdrop eligibility ticket
    Eligibility(commands::loyalty::EligibilityArgs),

    /// Fetch a wallet's loyalty point total
    Points(commands::loyalty::PointsArgs),

    /// Distribution batch management
    #[command(subcommand)]
    Batch(commands::distribution::BatchCommand),

    /// Product management
    #[command(subcommand)]
    Product(commands::commerce::ProductCommand),

    /// Order lifecycle
    #[command(subcommand)]
    Order(commands::commerce::OrderCommand),

    /// Badge claim tickets
    #[command(subcommand)]
    Badge(commands::commerce::BadgeCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if matches!(cli.command, Commands::Keygen) {
        return commands::keys::keygen();
    }

    let ctx = build_context(&cli)?;
    match cli.command {
        Commands::Keygen => unreachable!("handled above"),
        Commands::Event(command) => commands::loyalty::run_event(&ctx, command),
        Commands::Checkin(args) => commands::loyalty::run_checkin(&ctx, &args),
        Commands::Eligibility(args) => commands::loyalty::run_eligibility(&ctx, &args),
        Commands::Points(args) => commands::loyalty::run_points(&ctx, &args),
        Commands::Batch(command) => commands::distribution::run(&ctx, command),
        Commands::Product(command) => commands::commerce::run_product(&ctx, command),
        Commands::Order(command) => commands::commerce::run_order(&ctx, command),
        Commands::Badge(command) => commands::commerce::run_badge(&ctx, command),
    }
}

fn build_context(cli: &Cli) -> Result<ServiceContext> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database_path.clone_from(db);
    }

    let seed = std::env::var(SIGNING_KEY_ENV)
        .ok()
        .or_else(|| config.signing_key_seed.clone());
    let signer = seed
        .map(|seed| TicketSigner::from_seed_hex(&seed))
        .transpose()
        .context("loading the authorization signing key")?;

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;

    Ok(ServiceContext::new(store, signer, config))
}
