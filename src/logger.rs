use std::result::Result;

use snafu::ResultExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{registry, EnvFilter};

use crate::config::Settings;
use crate::error::{ApplicationError, InitializeLoggerSnafu};

/// Directives used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

/// Prefix of the rolling log file, a date suffix is added per day.
const LOG_FILE_PREFIX: &str = "livewatch.log";

/// Install the global subscriber: pretty output on stdout and a daily JSON log file
/// under `settings.log_dir`, both filtered by `RUST_LOG` (default `info`).
///
/// Keep the returned guard alive until exit, dropping it flushes the file log.
pub fn init(settings: &Settings) -> Result<WorkerGuard, ApplicationError> {
    let (file_layer, guard) = {
        let file_appender = tracing_appender::rolling::daily(&settings.log_dir, LOG_FILE_PREFIX);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = layer().with_ansi(false).json().with_writer(non_blocking);

        (layer, guard)
    };

    let console_layer = layer().pretty().with_writer(std::io::stdout);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = registry().with(filter).with(console_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber).context(InitializeLoggerSnafu)?;

    Ok(guard)
}
