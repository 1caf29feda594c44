//! Settings shared by the binaries, read from command line flags or the environment.

use std::path::PathBuf;

use clap::Args;
use time::Duration;
use tracing_subscriber::filter::LevelFilter;

use crate::{Error, timezone::get_local_offset};

/// Where the data lives and how the process behaves.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct Config {
    /// File path to the application SQLite database.
    #[arg(long, env = "FINTRACK_DB_PATH", default_value = "fintrack.db")]
    pub db_path: PathBuf,

    /// Canonical timezone used to decide today's date, e.g. "Pacific/Auckland".
    #[arg(long, env = "FINTRACK_TIMEZONE", default_value = "Etc/UTC")]
    pub timezone: String,

    /// How many hours a log-in session stays valid.
    #[arg(long, env = "FINTRACK_SESSION_HOURS", default_value_t = 24)]
    pub session_hours: u32,

    /// The most verbose level logged to stderr, unless RUST_LOG is set.
    #[arg(long, env = "FINTRACK_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Append debug logs to this file.
    #[arg(long, env = "FINTRACK_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Check the values that clap cannot check on its own.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] for an unknown timezone, or
    /// [Error::ConfigurationError] if the session length is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if get_local_offset(&self.timezone).is_none() {
            return Err(Error::InvalidTimezoneError(self.timezone.clone()));
        }

        if self.session_hours == 0 {
            return Err(Error::ConfigurationError(
                "session hours must be at least 1".to_owned(),
            ));
        }

        Ok(())
    }

    /// How long a log-in session stays valid.
    pub fn session_duration(&self) -> Duration {
        Duration::hours(i64::from(self.session_hours))
    }
}
