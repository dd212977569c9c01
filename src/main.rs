//! solconfirm - submit Solana transactions and track them to a target status
//!
//! ## Commands
//!
//! - **Queries**: balance, account, block, tx, status
//! - **Transfer**: SOL transfer confirmed by polling or signature subscription
//! - **Deploy**: create a rent-exempt program account from a `.so` file
//! - **Invoke**: call a deployed program and print its log output
//! - **Metrics**: dump the Prometheus text exposition

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solconfirm::config::Config;
use solconfirm::confirmation::{ConfirmStrategy, PubsubEvents};
use solconfirm::flows::{load_program, Pipeline};
use solconfirm::metrics::metrics;
use solconfirm::queries::lamports_to_sol;
use solconfirm::rpc_manager::{Cluster, LedgerRpc, SolanaRpc};
use solconfirm::types::Confirmation;
use solconfirm::wallet::Wallet;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Cluster preset overriding the configured endpoints
    #[arg(long)]
    cluster: Option<Cluster>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Balance of an account (defaults to the payer)
    Balance { account: Option<Pubkey> },
    /// Account owner, lamports and data size
    Account { account: Pubkey },
    /// Block summary (defaults to the latest finalized slot)
    Block {
        #[arg(long)]
        slot: Option<u64>,
    },
    /// Confirmed transaction details
    Tx { signature: Signature },
    /// Current status of a signature
    Status { signature: Signature },
    /// Transfer lamports from the payer
    Transfer {
        recipient: Pubkey,
        lamports: u64,
        /// Confirm through a signature subscription instead of polling
        #[arg(long)]
        subscribe: bool,
        /// Poll if the subscription cannot be used
        #[arg(long, requires = "subscribe")]
        fallback: bool,
    },
    /// Deploy a compiled program
    Deploy { path: String },
    /// Invoke a deployed program with the payer / recipient / system account list
    Invoke {
        program_id: Pubkey,
        recipient: Pubkey,
        #[arg(long, default_value = "transfer_sol_with_cpi")]
        method: String,
        #[arg(long, default_value_t = 100_000)]
        amount: u64,
    },
    /// Print collected metrics
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json)?;

    let mut config = load_config(&args.config)?;
    if let Some(cluster) = args.cluster {
        config.use_cluster(cluster);
    }
    info!(rpc = %config.rpc.url, ws = %config.rpc.ws_url, "solconfirm {}", env!("CARGO_PKG_VERSION"));

    let commitment = config.confirmation.commitment.commitment();
    let rpc = Arc::new(
        SolanaRpc::new(config.rpc.clone(), commitment).context("Failed to create RPC client")?,
    );

    match args.command {
        Command::Balance { account } => {
            let account = match account {
                Some(account) => account,
                None => load_wallet(&config)?.pubkey(),
            };
            println!("{}", rpc.balance(&account).await?);
        }
        Command::Account { account } => {
            println!("{}", rpc.account(&account).await?);
        }
        Command::Block { slot } => {
            println!("{}", rpc.block(slot).await?);
        }
        Command::Tx { signature } => {
            println!("{}", rpc.transaction(&signature).await?);
        }
        Command::Status { signature } => match rpc.signature_status(&signature).await? {
            Some(status) => match status.err {
                Some(err) => println!("{}: {} (failed: {})", signature, status.status, err),
                None => println!("{}: {}", signature, status.status),
            },
            None => println!("{}: unknown", signature),
        },
        Command::Transfer {
            recipient,
            lamports,
            subscribe,
            fallback,
        } => {
            let wallet = load_wallet(&config)?;
            let strategy = if subscribe {
                ConfirmStrategy::Subscription {
                    fallback_to_polling: fallback,
                }
            } else {
                config.confirmation.strategy
            };
            let pipeline = build_pipeline(&config, rpc, Events::for_strategy(strategy)).await?;
            info!(
                "Transferring {} SOL to {}",
                lamports_to_sol(lamports),
                recipient
            );
            let confirmation = pipeline
                .transfer(wallet.keypair(), &recipient, lamports, strategy)
                .await?;
            print_confirmation(&confirmation);
        }
        Command::Deploy { path } => {
            let wallet = load_wallet(&config)?;
            let bytes = load_program(&path).await?;
            let pipeline = build_pipeline(&config, rpc, Events::Required).await?;
            let outcome = pipeline.deploy(&bytes, wallet.keypair()).await?;
            println!("Program id: {}", outcome.program_id);
            println!(
                "Account: {} bytes, {} SOL rent-exempt",
                outcome.program_len,
                lamports_to_sol(outcome.rent_exempt_lamports)
            );
            print_confirmation(&outcome.confirmation);
        }
        Command::Invoke {
            program_id,
            recipient,
            method,
            amount,
        } => {
            let wallet = load_wallet(&config)?;
            let pipeline = build_pipeline(&config, rpc, Events::Required).await?;
            let outcome = pipeline
                .invoke_amount_call(&program_id, &method, amount, wallet.keypair(), &recipient)
                .await?;
            print_confirmation(&outcome.confirmation);
            if let Some(slot) = outcome.slot {
                println!("Slot: {}", slot);
            }
            for line in &outcome.logs {
                println!("  {}", line);
            }
        }
        Command::Metrics => {
            print!("{}", metrics().gather_text()?);
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "solconfirm=debug,info"
    } else {
        "solconfirm=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if !std::path::Path::new(path).exists() {
        warn!("Config file '{}' not found, using defaults", path);
    }
    Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
}

fn load_wallet(config: &Config) -> Result<Wallet> {
    let wallet = match &config.wallet.keypair_path {
        Some(path) => Wallet::from_file(path),
        None => Wallet::from_env(&config.wallet.payer_env),
    }
    .context("Failed to load payer wallet")?;
    info!("Payer: {}", wallet.pubkey());
    Ok(wallet)
}

/// Whether a command needs the websocket endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Events {
    Off,
    /// Connect if possible; confirmation falls back to polling otherwise
    Optional,
    Required,
}

impl Events {
    fn for_strategy(strategy: ConfirmStrategy) -> Self {
        match strategy {
            ConfirmStrategy::Polling => Self::Off,
            ConfirmStrategy::Subscription {
                fallback_to_polling: true,
            } => Self::Optional,
            ConfirmStrategy::Subscription {
                fallback_to_polling: false,
            } => Self::Required,
        }
    }
}

async fn build_pipeline(config: &Config, rpc: Arc<SolanaRpc>, events: Events) -> Result<Pipeline> {
    let pipeline = Pipeline::new(rpc, config.confirmation.tracker_config());
    if events == Events::Off {
        return Ok(pipeline);
    }
    match PubsubEvents::connect(&config.rpc.ws_url).await {
        Ok(pubsub) => Ok(pipeline.with_events(Arc::new(pubsub))),
        Err(e) if events == Events::Optional => {
            warn!(ws = %config.rpc.ws_url, error = %e, "Websocket unavailable, confirming by polling");
            Ok(pipeline)
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to connect to {}", config.rpc.ws_url))
        }
    }
}

fn print_confirmation(confirmation: &Confirmation) {
    println!("Signature: {}", confirmation.signature);
    println!(
        "Status: {} via {} ({} attempts, {:.1}s)",
        confirmation.status,
        confirmation.source,
        confirmation.attempts,
        confirmation.elapsed.as_secs_f64()
    );
    if let Some(err) = &confirmation.err {
        println!("Execution error: {}", err);
    }
    if confirmation.timed_out {
        println!("Target status not reached in time; re-query the signature later");
    }
}
