use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use zenith_vault::contracts::{find_source, CATALOG};
use zenith_vault::utils::helper::format_address;
use zenith_vault::{
    BalancePoller, CompositeEventHandler, ConsoleEventHandler, ContractAssistant, GeminiAssistant,
    JsonLogEventHandler, RpcVaultReader, RpcVaultSigner, StakeController, StatsPoller, VaultConfig,
    VaultEventHandler, VaultReader, VaultWriter,
};

#[derive(Parser)]
#[command(name = "zenith-vault", version, about = "Stake into and monitor the Zenith ERC-4626 vault")]
struct Cli {
    /// JSON-RPC endpoint (overrides VAULT_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll position, protocol stats and solvency until Ctrl+C
    Watch,
    /// Print protocol stats and solvency once
    Stats,
    /// Approve if needed, then deposit AMOUNT tokens
    Stake { amount: String },
    /// Redeem every share held by the account
    Withdraw,
    /// Owner only: inject 1000 tokens of yield into the vault
    SimulateYield,
    /// Print or export contract source
    Source {
        /// File or contract name (defaults to the vault)
        name: Option<String>,
        /// Write the file into this directory instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
        /// List available files
        #[arg(long)]
        list: bool,
    },
    /// Ask the AI assistant about the contracts
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();
    let mut config = VaultConfig::from_env().context("Failed to load configuration")?;
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }

    tokio::runtime::Runtime::new()?.block_on(async move {
        match cli.command {
            Command::Watch => watch(config).await,
            Command::Stats => stats(config).await,
            Command::Stake { amount } => {
                let controller = build_controller(&config).await?;
                report(controller.stake_amount(&amount).await)
            }
            Command::Withdraw => {
                let controller = build_controller(&config).await?;
                report(controller.withdraw().await)
            }
            Command::SimulateYield => {
                let controller = build_controller(&config).await?;
                report(controller.simulate_yield().await)
            }
            Command::Source { name, out, list } => source(name, out, list),
            Command::Ask { question } => {
                let assistant = GeminiAssistant::new(config.gemini_api_key.clone(), &config.gemini_model);
                println!("{}", assistant.ask(&question.join(" ")).await);
                Ok(())
            }
        }
    })
}

/// Console output, plus the JSON event log when `EVENTS_LOG` is set
fn event_handler(config: &VaultConfig) -> Arc<dyn VaultEventHandler> {
    let mut handler = CompositeEventHandler::new();
    handler.add_handler(Arc::new(ConsoleEventHandler::new()));

    if let Some(path) = &config.events_log {
        info!("Appending events to {}", path.display());
        handler.add_handler(Arc::new(JsonLogEventHandler::new(path.clone())));
    }

    Arc::new(handler)
}

async fn build_controller(config: &VaultConfig) -> anyhow::Result<StakeController> {
    let signer = Arc::new(
        RpcVaultSigner::connect(config)
            .await
            .context("Failed to connect wallet")?,
    );
    let handler = event_handler(config);

    info!("Account: {}", format_address(&signer.account()));

    let poller = Arc::new(
        BalancePoller::new(signer.account(), signer.clone(), handler.clone())
            .with_expected_chain(config.chain_id),
    );

    Ok(StakeController::new(signer, handler)
        .with_reset_delay(config.status_reset_delay)
        .with_expected_chain(config.chain_id)
        .with_balance_poller(poller))
}

fn report(result: Result<alloy::primitives::TxHash, zenith_vault::VaultError>) -> anyhow::Result<()> {
    match result {
        Ok(tx) => {
            info!("Done: {}", tx);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}

async fn stats(config: VaultConfig) -> anyhow::Result<()> {
    let reader: Arc<dyn VaultReader> = Arc::new(RpcVaultReader::new(&config)?);
    let handler = event_handler(&config);
    let poller = StatsPoller::new(reader, handler);

    let (stats, solvency) = tokio::join!(poller.poll_stats(), poller.poll_solvency());
    stats?;
    solvency?;
    Ok(())
}

async fn watch(config: VaultConfig) -> anyhow::Result<()> {
    let handler = event_handler(&config);
    let mut tasks = Vec::new();

    // Without a configured account fall back to the read-only endpoint
    let reader: Arc<dyn VaultReader> = if config.has_signer() {
        let signer = Arc::new(RpcVaultSigner::connect(&config).await?);
        let poller = Arc::new(
            BalancePoller::new(signer.account(), signer.clone(), handler.clone())
                .with_expected_chain(config.chain_id),
        );
        let interval = config.poll_interval;
        tasks.push(tokio::spawn(async move { poller.start_polling(interval).await }));
        let reader: Arc<dyn VaultReader> = signer;
        reader
    } else {
        warn!("No PRIVATE_KEY or ACCOUNT_ADDRESS set, showing protocol stats only");
        let reader: Arc<dyn VaultReader> = Arc::new(RpcVaultReader::new(&config)?);
        reader
    };

    let stats_poller = Arc::new(StatsPoller::new(reader, handler));

    let poller = stats_poller.clone();
    let interval = config.stats_interval;
    tasks.push(tokio::spawn(async move { poller.start_stats_polling(interval).await }));

    let poller = stats_poller.clone();
    let interval = config.solvency_interval;
    tasks.push(tokio::spawn(async move { poller.start_solvency_polling(interval).await }));

    info!("Zenith vault monitor is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    for task in tasks {
        task.abort();
    }
    info!("Shutting down...");
    Ok(())
}

fn source(name: Option<String>, out: Option<PathBuf>, list: bool) -> anyhow::Result<()> {
    if list {
        for entry in CATALOG {
            println!("{} ({})", entry.file_name, entry.contract);
        }
        return Ok(());
    }

    let Some(entry) = find_source(name.as_deref()) else {
        error!("Unknown contract {:?}", name);
        anyhow::bail!("Unknown contract; use --list to see available files");
    };

    match out {
        Some(dir) => {
            let path = entry.export_to(&dir)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", entry.source),
    }
    Ok(())
}
