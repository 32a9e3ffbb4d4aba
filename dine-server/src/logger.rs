//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level. With a log directory set,
//! output goes to a daily rolling file instead of stdout.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::{BoxError, LogConfig};

/// Install the global subscriber
///
/// Keep the returned guard alive for the lifetime of the process, dropping it
/// stops the background file writer.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match config.dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(Path::new(dir))?;
            let appender = tracing_appender::rolling::daily(dir, "dine-server.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_ansi(config.dir.is_none() && !config.json);

    if config.json {
        builder.json().try_init()?;
    } else {
        builder.try_init()?;
    }
    Ok(guard)
}
