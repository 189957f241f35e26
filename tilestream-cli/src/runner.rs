//! Shared setup for commands that touch tile data.

use std::sync::Arc;

use tilestream::config::ConfigFile;
use tilestream::logging::{init_logging, LoggingGuard};
use tilestream::scheduler::{RayonScheduler, SchedulerPtr};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the logging it initialized.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Loads the config file and installs logging.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = init_logging(&config.logging)?;
        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            elevation = ?self.config.elevation.directory,
            albedo = ?self.config.albedo.directory,
            "tilestream starting"
        );
    }

    /// Worker pool sized from `[loader] worker_threads`.
    pub fn scheduler(&self) -> Result<SchedulerPtr, CliError> {
        let scheduler = RayonScheduler::new(self.config.loader.worker_threads)?;
        Ok(Arc::new(scheduler))
    }
}
