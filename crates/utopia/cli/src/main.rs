//! Utopia CLI - operate a file-backed workspace ledger
//!
//! Every command loads the ledger snapshot, runs at most one transaction
//! against it and writes the snapshot back only when that transaction
//! committed.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utopia_contract::{ContractConfig, UtopiaContract, FUNCTIONS};
use utopia_ledger::{InMemoryLedger, TxHeader};
use uuid::Uuid;

mod error;
mod snapshot;

use error::CliResult;

/// Utopia CLI application
#[derive(Parser)]
#[command(name = "utopia")]
#[command(about = "Utopia - collaborative workspace ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Ledger snapshot file
    #[arg(short, long, env = "UTOPIA_LEDGER", default_value = "utopia-ledger.json")]
    ledger: PathBuf,

    /// Configuration file path
    #[arg(short, long, env = "UTOPIA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the ledger counters
    Init,

    /// Run one named operation
    Invoke {
        /// Operation name, e.g. createParticipant
        function: String,

        /// Positional string arguments
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the state root and block height
    StateRoot,

    /// List the operations `invoke` accepts
    Functions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();

    run(cli).await?;
    Ok(())
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => ContractConfig::load(path)?,
        None => ContractConfig::default(),
    };

    match cli.command {
        Commands::Init => {
            let ledger = Arc::new(snapshot::open(&cli.ledger)?);
            let contract = UtopiaContract::new(ledger.clone(), config);
            contract.init(envelope()).await?;
            snapshot::persist(&cli.ledger, &ledger)?;
            println!("Initialized ledger at {}", cli.ledger.display());
        }
        Commands::Invoke { function, args } => {
            let ledger = Arc::new(snapshot::open(&cli.ledger)?);
            let contract = UtopiaContract::new(ledger.clone(), config);
            let response = contract.invoke(envelope(), &function, &args).await?;
            persist_if_present(&cli.ledger, &ledger)?;
            println!("{}", String::from_utf8_lossy(&response));
        }
        Commands::StateRoot => {
            let ledger = snapshot::open(&cli.ledger)?;
            let report = serde_json::json!({
                "height": ledger.height()?,
                "state_root": ledger.state_root()?,
            });
            println!("{}", report);
        }
        Commands::Functions => {
            for function in FUNCTIONS {
                println!("{}", function);
            }
        }
    }
    Ok(())
}

/// Queries on a ledger that was never written must not create the file.
fn persist_if_present(path: &Path, ledger: &InMemoryLedger) -> CliResult<()> {
    if path.exists() || ledger.height()? > 0 {
        snapshot::persist(path, ledger)?;
    }
    Ok(())
}

/// The CLI plays the role of the transaction envelope.
fn envelope() -> TxHeader {
    TxHeader::new(Uuid::new_v4().to_string(), Utc::now())
}
