//! Component assembly and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `streamtap-daemon`.
//! It builds the detection chain from configuration, runs the rotation
//! watcher, and performs an ordered shutdown.
//!
//! # Startup
//!
//! 1. Metrics recorder (optional)
//! 2. Notifier (HTTP, or log-only when notifications are disabled)
//! 3. Extractor + dedup cache + dispatcher -> `StreamDetector`
//! 4. Rotation watcher task
//!
//! # Shutdown
//!
//! 1. Cancel the watcher (it stops and awaits its tail session)
//! 2. Drain in-flight notifications, bounded by [`NOTIFY_DRAIN_TIMEOUT`]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use streamtap_core::config::StreamtapConfig;
use streamtap_core::pipeline::Notifier;
use streamtap_log_watcher::{
    DedupCache, Dispatcher, LineHandler, LogOnlyNotifier, RotationConfig, RotationWatcher,
    StreamDetector, StreamUrlExtractor,
};

use crate::metrics_server;
use crate::notifier::HttpNotifier;

/// Upper bound on waiting for in-flight notifications at shutdown.
pub const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: StreamtapConfig,
    /// Line handler shared with tail sessions.
    detector: Arc<StreamDetector>,
    /// Cancels the watcher loop.
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// A missing config file falls back to defaults plus environment overrides.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = StreamtapConfig::load_or_default(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Installs the metrics recorder when `[metrics] enabled = true`.
    pub fn build_from_config(config: StreamtapConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let notifier: Arc<dyn Notifier> = if config.notify.enabled {
            let http = HttpNotifier::new(&config.notify)
                .map_err(|e| anyhow::anyhow!("failed to build notifier: {}", e))?;
            tracing::info!(endpoint = http.endpoint(), "notifications enabled");
            Arc::new(http)
        } else {
            tracing::info!("notifications disabled, detected streams are only logged");
            Arc::new(LogOnlyNotifier)
        };

        Self::build_with_notifier(config, notifier)
    }

    /// Build with a caller-supplied notifier.
    ///
    /// The `[notify]` and `[metrics]` sections are ignored.
    pub fn build_with_notifier(config: StreamtapConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let dedup = Arc::new(DedupCache::new(Duration::from_secs(
            config.watcher.dedup_window_secs,
        )));
        let detector = StreamDetector::new(StreamUrlExtractor::new()?, dedup, Dispatcher::new(notifier));

        tracing::debug!(
            log_dir = %config.watcher.resolved_log_dir().display(),
            dedup_window_secs = config.watcher.dedup_window_secs,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            detector: Arc::new(detector),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &StreamtapConfig {
        &self.config
    }

    /// Run the watcher until SIGINT/SIGTERM or the shutdown token fires.
    ///
    /// Returns after the tail session is closed and pending notifications
    /// have drained (or the drain timed out).
    pub async fn run(self) -> Result<()> {
        let watcher = RotationWatcher::new(
            RotationConfig::from_core(&self.config.watcher),
            Arc::clone(&self.detector) as Arc<dyn LineHandler>,
            self.shutdown.clone(),
        );
        let mut watcher_task = tokio::spawn(watcher.run());

        tracing::info!("streamtap running");

        // Shutdown requests win over a watcher that has also just returned,
        // so the drain below always runs.
        let mut signal_result = Ok(());
        let joined = tokio::select! {
            biased;
            signal = wait_for_shutdown_signal() => {
                match signal {
                    Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                    Err(e) => signal_result = Err(e),
                }
                None
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("shutdown requested");
                None
            }
            joined = &mut watcher_task => {
                tracing::warn!("watcher stopped without a shutdown request");
                Some(joined)
            }
        };

        self.shutdown.cancel();
        let joined = match joined {
            Some(joined) => joined,
            None => watcher_task.await,
        };
        let watcher_result = joined.map_err(|e| anyhow::anyhow!("watcher task failed: {}", e));

        let dispatcher = self.detector.dispatcher();
        let pending = dispatcher.in_flight();
        if pending > 0 {
            tracing::info!(pending, "waiting for in-flight notifications");
        }
        if !dispatcher.drain(NOTIFY_DRAIN_TIMEOUT).await {
            tracing::warn!(
                pending = dispatcher.in_flight(),
                "notification drain timed out"
            );
        }

        signal_result.and(watcher_result)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("CTRL_C")
}
