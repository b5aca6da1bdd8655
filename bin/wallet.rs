//! `ledger-wallet`: a standalone CLI wallet, independent of a running
//! node process: key management plus a "craft and sign a spend"
//! command. There is no RPC surface to submit a transaction to here,
//! so `send` prints the signed transaction as JSON for the operator to
//! forward through whatever integration they run.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use ledger_node::crypto::{EcdsaKeyPair, KeyProvider};
use ledger_node::Transaction;

#[derive(Parser)]
#[command(name = "ledger-wallet", about = "Offline keypair and transaction tooling")]
struct Cli {
    /// Path to the keypair file (SEC1 DER).
    #[arg(long, default_value = "wallet.key")]
    keyfile: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new keypair and persist it to `--keyfile`.
    Keygen,
    /// Print the address (SPKI-hex public key) of `--keyfile`.
    Address,
    /// Craft and sign a transaction spending from `--keyfile`'s address,
    /// printing it as JSON on stdout.
    Send {
        to: String,
        amount: i64,
    },
}

fn load_keypair(path: &PathBuf) -> anyhow::Result<EcdsaKeyPair> {
    let der = std::fs::read(path).map_err(|err| anyhow::anyhow!("reading {}: {err}", path.display()))?;
    EcdsaKeyPair::import_private(&der).map_err(|err| anyhow::anyhow!("malformed keypair at {}: {err}", path.display()))
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_secs()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Keygen => {
            if cli.keyfile.exists() {
                anyhow::bail!("{} already exists; refusing to overwrite a keypair", cli.keyfile.display());
            }
            let keypair = EcdsaKeyPair::generate();
            if let Some(parent) = cli.keyfile.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&cli.keyfile, keypair.export_private())?;
            println!("{}", keypair.public_key_hex());
        }
        Command::Address => {
            let keypair = load_keypair(&cli.keyfile)?;
            println!("{}", keypair.public_key_hex());
        }
        Command::Send { to, amount } => {
            anyhow::ensure!(amount > 0, "amount must be positive for a user transaction");
            let keypair = load_keypair(&cli.keyfile)?;
            let tx = Transaction::new_signed(&keypair, &to, amount, unix_timestamp());
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
    }

    Ok(())
}
