//! Sets up the global tracing subscriber.

use std::{fs::OpenOptions, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::Error;

/// Install the global subscriber.
///
/// Human readable logs go to stderr, filtered by `RUST_LOG` if it is set and
/// by `level` otherwise. Stdout is left for command output. If `log_file` is
/// given, everything at DEBUG and above is also appended to that file.
///
/// # Errors
/// Returns an [Error::ConfigurationError] if the log file cannot be opened or
/// a subscriber was already installed.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<(), Error> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let file_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| {
                    Error::ConfigurationError(format!(
                        "could not open log file {}: {error}",
                        path.display()
                    ))
                })?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(file_log)
        .try_init()
        .map_err(|error| Error::ConfigurationError(error.to_string()))
}
