//! Binary entry point: the `ledger-node` CLI.
//!
//! `run` starts a node (store, transport, keypair, coordinator, and
//! optionally the miner); `keygen` and `address` are convenience
//! commands for operators to manage a reward keypair without writing
//! code.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ledger_node::config::Config;
use ledger_node::crypto::{EcdsaKeyPair, KeyProvider};
use ledger_node::node::NodeCoordinator;
use ledger_node::store::FileStore;
use ledger_node::transport::WebSocketTransport;

#[derive(Parser)]
#[command(name = "ledger-node", about = "A Bitcoin-inspired proof-of-work blockchain node")]
struct Cli {
    /// Path to a TOML config file. Defaults to `<data-dir>/ledger.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the node: load or generate a keypair, attach the store and
    /// transport, and serve inbound peers. Mines immediately if
    /// `mine_on_start` is set.
    Run,
    /// Generate a new keypair and persist it to the data directory.
    Keygen,
    /// Print the address (public key hex) of the persisted keypair.
    Address,
}

fn load_config(cli: &Cli) -> Config {
    let default = Config::default();
    let path = cli.config.clone().unwrap_or_else(|| default.data_dir.join("ledger.toml"));
    match Config::from_file(&path) {
        Ok(config) => config,
        Err(_) => default,
    }
}

fn load_or_generate_keypair(config: &Config) -> anyhow::Result<EcdsaKeyPair> {
    let path = config.keypair_path();
    if let Ok(der) = std::fs::read(&path) {
        return EcdsaKeyPair::import_private(&der)
            .map_err(|err| anyhow::anyhow!("stored keypair at {} is unreadable: {err}", path.display()));
    }
    let keypair = EcdsaKeyPair::generate();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, keypair.export_private())?;
    Ok(keypair)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Command::Keygen => {
            let keypair = EcdsaKeyPair::generate();
            std::fs::create_dir_all(&config.data_dir)?;
            std::fs::write(config.keypair_path(), keypair.export_private())?;
            println!("{}", keypair.public_key_hex());
            Ok(())
        }
        Command::Address => {
            let keypair = load_or_generate_keypair(&config)?;
            println!("{}", keypair.public_key_hex());
            Ok(())
        }
        Command::Run => run_node(config).await,
    }
}

async fn run_node(config: Config) -> anyhow::Result<()> {
    if config.difficulty_override.is_some() {
        tracing::warn!(
            "difficulty_override is set but ignored: the consensus difficulty is fixed at \
             compile time to avoid forking the network from a runtime config knob"
        );
    }

    let keypair = load_or_generate_keypair(&config)?;
    let reward_address = config.reward_address.clone().unwrap_or_else(|| keypair.public_key_hex());

    let store = Arc::new(FileStore::new(config.chain_store_path()));
    let transport = Arc::new(WebSocketTransport::new(config.seed_peers.clone()));
    let coordinator = Arc::new(NodeCoordinator::new(reward_address, store, transport.clone()));

    coordinator
        .initialize_from_store()
        .await
        .map_err(|err| anyhow::anyhow!("chain store I/O error at startup: {err}"))?;

    let listener = {
        let coordinator = coordinator.clone();
        let listen_addr = config.listen_addr.clone();
        tokio::spawn(async move {
            if let Err(err) = WebSocketTransport::serve(&listen_addr, coordinator).await {
                tracing::error!(%err, "inbound transport listener exited");
            }
        })
    };

    if config.mine_on_start {
        coordinator.start_mining();
    }

    tracing::info!(listen_addr = %config.listen_addr, "node running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    listener.abort();
    coordinator.shutdown().await;
    Ok(())
}
