//! Tracing subscriber setup.

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use waypoint_core::{Error, Result};

use crate::config::{LogConfig, LogFormat};

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process when a log
/// file is configured; dropping it flushes and stops the file writer.
pub fn init_tracing(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_filter.as_str().into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(path) = &config.file {
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("waypoint.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let installed = match config.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        // no ANSI in files unless asked for
                        .with_ansi(config.ansi.unwrap_or(false)),
                )
                .try_init(),
        };
        installed.map_err(|e| Error::Config(format!("Tracing already initialized: {}", e)))?;
        Some(guard)
    } else {
        let installed = match config.format {
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init(),
            LogFormat::Text => {
                let mut layer = tracing_subscriber::fmt::layer();
                if let Some(ansi) = config.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).try_init()
            }
        };
        installed.map_err(|e| Error::Config(format!("Tracing already initialized: {}", e)))?;
        None
    };

    info!(
        subsystem = "actions",
        component = "telemetry",
        log_format = ?config.format,
        log_file = config
            .file
            .as_deref()
            .and_then(|p| p.to_str())
            .unwrap_or("(stdout)"),
        "Logging initialized"
    );
    Ok(guard)
}
