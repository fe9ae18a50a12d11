use anyhow::Result;
use clap::Parser;

use streamtap_daemon::cli::DaemonCli;
use streamtap_daemon::logging;
use streamtap_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = cli.load_config().await?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_dir = %config.watcher.resolved_log_dir().display(),
        dry_run = cli.dry_run,
        "streamtap-daemon starting"
    );

    let orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await?;

    tracing::info!("streamtap-daemon shut down");
    Ok(())
}
