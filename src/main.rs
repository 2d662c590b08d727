use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use restock_monitor::application::CheckStockResponse;
use restock_monitor::infrastructure::config::ConfigOrigin;
use restock_monitor::infrastructure::{ConfigManager, DatabaseConnection, logging};

#[derive(Parser)]
#[command(name = "restock-monitor")]
#[command(version, about = "Check tracked product pages and email owners when items are back in stock.")]
struct CommandLine {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Database URL, overriding `database.url`
    #[arg(long, value_name = "URL")]
    database: Option<String>,
    /// Print a summary line instead of JSON
    #[arg(long)]
    text: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CommandLine::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Stock check failed: {:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CommandLine) -> anyhow::Result<()> {
    let manager = match args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let (mut config, origin) = manager.load_config_with_origin().await?;
    if let Some(url) = args.database {
        config.database.url = url;
    }

    logging::init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    logging::log_system_info();
    if origin == ConfigOrigin::CreatedDefault {
        info!("Configuration file not found, created default: {:?}", manager.config_path);
    }
    info!("Loaded configuration from: {:?}", manager.config_path);
    config.validate().context("Invalid configuration")?;

    let database = DatabaseConnection::new(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    database.migrate().await?;

    let runner = restock_monitor::build_runner(&config, &database)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling remaining products");
            on_signal.cancel();
        }
    });

    let report = runner.run_with_cancellation(cancel).await?;
    let response = CheckStockResponse::from(&report);
    info!("{}", report.summary());

    if args.text {
        println!("{}", report.summary());
    } else {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(())
}
