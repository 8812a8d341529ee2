use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Installs the global subscriber: stdout plus a daily rolling file under `log_dir`.
///
/// The returned guard must stay alive for the lifetime of the process,
/// otherwise buffered file output is dropped.
pub fn init_logging(cfg: &AppConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", cfg.log_dir))?;

    let file_appender = tracing_appender::rolling::daily(&cfg.log_dir, "fleet-report.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
