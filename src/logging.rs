use anyhow::{Context, Result};
use configuration::{LogFormat, LoggingSettings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Console output goes through the
/// indicatif writer so log lines do not tear progress bars. When a directory is
/// configured, a daily rolling file is written as well; the returned guard must
/// be held until exit to flush it.
pub fn init(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("Invalid log level directive '{}'", settings.level))?,
    };

    let indicatif_layer = IndicatifLayer::new();
    let console = match settings.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(indicatif_layer.get_stderr_writer())
            .with_target(false)
            .compact()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(indicatif_layer.get_stderr_writer())
            .boxed(),
    };

    let (file_layer, guard) = match &settings.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).with_context(|| {
                format!("Failed to create log directory {}", directory.display())
            })?;
            let appender = tracing_appender::rolling::daily(directory, &settings.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(indicatif_layer)
        .with(filter)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(guard)
}
