//! CLI error type.

use std::fmt;

use tilestream::altitude::AltitudeError;
use tilestream::config::ConfigError;
use tilestream::scheduler::SchedulerError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem with a user-facing explanation.
    Config(String),
    /// Reading, writing or validating the config file failed.
    ConfigFile(ConfigError),
    /// Command-line arguments are out of range.
    InvalidArgument(String),
    /// The worker pool could not be started.
    Scheduler(SchedulerError),
    /// An altitude query failed.
    Altitude(AltitudeError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Scheduler(e) => write!(f, "Worker pool error: {}", e),
            CliError::Altitude(e) => write!(f, "Altitude query failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Scheduler(e) => Some(e),
            CliError::Altitude(e) => Some(e),
            CliError::Config(_) | CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<SchedulerError> for CliError {
    fn from(e: SchedulerError) -> Self {
        CliError::Scheduler(e)
    }
}

impl From<AltitudeError> for CliError {
    fn from(e: AltitudeError) -> Self {
        CliError::Altitude(e)
    }
}
