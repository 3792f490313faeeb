//! Tracing subscriber setup.
//!
//! Output goes to stdout, to a rolling file under `log.filepath`, or to
//! both, as text or JSON lines. `RUST_LOG` always wins over the configured
//! level.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use vllmd_core::{LogConfig, LogFormat, LogRotation};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Rotated files are named `vllmd.<period>.log`.
const LOG_FILE_PREFIX: &str = "vllmd";

/// Build the filter: `RUST_LOG` wins, then the configured level.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

fn fmt_layer<W>(format: LogFormat, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(ansi);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Rolling appender in `config.filepath`, keeping at most `max_count` files.
pub fn file_appender(config: &LogConfig) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.filepath).with_context(|| {
        format!("failed to create log directory {}", config.filepath.display())
    })?;

    RollingFileAppender::builder()
        .rotation(rotation(config.rotation))
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.max_count)
        .build(&config.filepath)
        .with_context(|| format!("failed to open log file in {}", config.filepath.display()))
}

/// Output layers for `config.redirect`.
///
/// The guard flushes the background file writer on drop; it is `Some`
/// whenever a file is written.
pub fn layers(config: &LogConfig) -> anyhow::Result<(Vec<BoxedLayer>, Option<WorkerGuard>)> {
    let mut layers = Vec::with_capacity(2);
    if config.redirect.to_stdout() {
        layers.push(fmt_layer(config.format, config.ansi, std::io::stdout));
    }

    let guard = if config.redirect.to_file() {
        let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);
        // No color codes in files
        layers.push(fmt_layer(config.format, false, writer));
        Some(guard)
    } else {
        None
    };

    Ok((layers, guard))
}

/// Install the global subscriber. Safe to call more than once; only the
/// first call takes effect.
///
/// Hold the returned guard until exit, or buffered file output is lost.
pub fn init(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let (layers, guard) = layers(config)?;
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init();
    Ok(guard)
}
