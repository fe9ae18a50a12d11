//! CLI argument definitions for streamtap-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! CLI values are applied after the config file and `STREAMTAP_*`
//! environment overrides, so they always win.

use std::path::PathBuf;

use clap::Parser;

use streamtap_core::config::StreamtapConfig;

/// VRChat stream watcher daemon.
///
/// Follows the newest VRChat output log, detects `vrcdn.live` stream URLs,
/// and reports each new stream once per dedup window.
#[derive(Parser, Debug)]
#[command(name = "streamtap-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to streamtap.toml configuration file.
    ///
    /// A missing file is not an error; defaults are used instead.
    #[arg(short, long, default_value = "streamtap.toml")]
    pub config: PathBuf,

    /// Override the VRChat log directory to watch.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Detect and log streams without sending notifications.
    #[arg(long)]
    pub dry_run: bool,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Load the configuration in precedence order and validate the result.
    ///
    /// The file (or defaults) and `STREAMTAP_*` variables are read first, CLI
    /// flags are applied on top, and only the merged config is validated.
    pub async fn load_config(&self) -> anyhow::Result<StreamtapConfig> {
        let mut config = StreamtapConfig::read_or_default(&self.config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(config)
    }

    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut StreamtapConfig) {
        if let Some(dir) = &self.log_dir {
            config.watcher.log_dir = dir.display().to_string();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if self.dry_run {
            config.notify.enabled = false;
        }
    }
}
