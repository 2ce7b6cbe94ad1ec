//! coinwatch - crypto price tracker entry point.

use anyhow::Result;
use clap::Parser;
use coinwatch_tracker::{AppConfig, Application, Cli};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any HTTPS or TLS DB connections)
    coinwatch_feed::init_crypto();

    let cli = Cli::parse();

    // Config path: CLI arg > COINWATCH_CONFIG env var > default
    let (config_path, _) = AppConfig::resolve_path(cli.config.as_deref());
    let config = AppConfig::load(cli.config.as_deref())?;
    let settings = config.validate()?;

    coinwatch_telemetry::init_logging(Some(&settings.log_level))?;

    info!("Starting coinwatch v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        file_found = Path::new(&config_path).exists(),
        backend = %settings.database.backend,
        coins = settings.tracking.coin_ids().len(),
        "Configuration loaded"
    );

    let app = Application::new(settings);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app.execute(cli.command, &mut out).await?;

    Ok(())
}
