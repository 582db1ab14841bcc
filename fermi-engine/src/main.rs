//! fermi-engine - command-line estimator
//!
//! Reads one estimation request (JSON), runs the pipeline and prints the audit
//! document as JSON on stdout. Logs go to stderr (or the configured file).
//!
//! Config file resolution: `--config` → `FERMI_CONFIG` → per-user config file → defaults.

use anyhow::{Context, Result};
use clap::Parser;
use fermi_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use fermi_engine::{EngineConfig, EstimationRequest, Estimator};
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for fermi-engine
#[derive(Parser, Debug)]
#[command(name = "fermi-engine")]
#[command(about = "Comparability-scored multi-source Fermi estimation")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Estimation request (JSON)
    #[arg(short, long)]
    request: PathBuf,

    /// Log level override (e.g. "debug", "fermi_engine=trace")
    #[arg(long, env = "FERMI_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config = EngineConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    fermi_common::logging::init_tracing(&config.logging).context("Failed to initialize logging")?;
    info!("Starting fermi-engine v{}", env!("CARGO_PKG_VERSION"));

    let request_json = std::fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request {}", args.request.display()))?;
    let request: EstimationRequest = serde_json::from_str(&request_json)
        .with_context(|| format!("Invalid request {}", args.request.display()))?;

    let estimator = Estimator::from_config(&config).context("Failed to configure estimator")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling pending sources");
            interrupt.cancel();
        }
    });

    let document = estimator
        .estimate_with_cancel(&request, &cancel)
        .await
        .context("Estimation failed")?;

    println!("{}", document.to_json()?);
    Ok(())
}
