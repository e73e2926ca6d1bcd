//! Shared setup for subcommands: config, logging and the tokio runtime.

use crate::error::CliError;
use std::path::{Path, PathBuf};
use thumbcache::config::{config_file_path, ConfigFile};
use thumbcache::logging::{init_logging, LoggingGuard};
use tracing::info;

/// Holds what a subcommand needs for its whole run.
pub struct CliRunner {
    /// Flushes the log file when dropped
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
    /// Where the configuration came from
    config_path: PathBuf,
}

impl CliRunner {
    /// Load config (from `config_path` or the default location) and
    /// initialize logging.
    ///
    /// A missing default config file falls back to built-in defaults; an
    /// explicitly named file must exist.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let (config, config_path) = load_config(config_path)?;

        let logging_guard = init_logging(config.logging.file.as_deref())
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    /// Logs version and config source at the start of a command.
    pub fn log_startup(&self, command: &str) {
        info!("thumbcache v{}", thumbcache::VERSION);
        info!(
            config = %self.config_path.display(),
            "thumbcache CLI: {} command", command
        );
    }

    /// Builds a multi-threaded tokio runtime.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("thumbcache")
            .build()
            .map_err(CliError::Runtime)
    }
}

/// Loads configuration without touching logging.
pub fn load_config(config_path: Option<&Path>) -> Result<(ConfigFile, PathBuf), CliError> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            Ok((ConfigFile::load_from(path)?, path.to_path_buf()))
        }
        None => Ok((ConfigFile::load()?, config_file_path())),
    }
}
