//! Reading and writing `~/.thumbcache/config.ini`, and turning the parsed
//! settings into the runtime configs the library consumes.

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::settings::{ConfigFile, LoaderType};

use crate::loader::LoaderConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::pool::PoolConfig;
use crate::render::RenderLimits;

/// Errors from loading, validating or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// File exists but is not valid INI
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// A key holds a value that cannot be used
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Write the commented INI form to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_config_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Commented INI text for this configuration.
    pub fn to_config_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Render bounds from `[render]` and `[loader]`.
    pub fn render_limits(&self) -> RenderLimits {
        RenderLimits {
            max_width: self.render.max_width,
            max_height: self.render.max_height,
            max_input_dimension: self.render.max_input_dimension,
            jpeg_quality: self.render.jpeg_quality,
        }
    }

    /// Loader selection from `[loader]`.
    pub fn loader_config(&self) -> Result<LoaderConfig, ConfigFileError> {
        let max_size = self.loader.max_size as u64;
        match self.loader.loader_type {
            LoaderType::Http => Ok(LoaderConfig::Http {
                timeout: Duration::from_secs(self.loader.timeout),
                max_size,
            }),
            LoaderType::File => match &self.loader.root {
                Some(root) => Ok(LoaderConfig::File {
                    root: root.clone(),
                    max_size,
                }),
                None => Err(ConfigFileError::InvalidValue {
                    section: "loader".to_string(),
                    key: "root".to_string(),
                    value: String::new(),
                    reason: "required when type = file".to_string(),
                }),
            },
        }
    }

    /// Dispatch and claim policy from `[render]`, `[cache]` and `[workers]`.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            mode: self.render.mode,
            claim_ttl: seconds_or_forever(self.cache.claim_ttl),
            failed_ttl: seconds_or_forever(self.cache.failed_ttl),
            pool: PoolConfig {
                workers: self.workers.count,
                queue_capacity: self.workers.queue_capacity,
            },
        }
    }
}

/// Zero means no expiry.
fn seconds_or_forever(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Get the path to the config directory (~/.thumbcache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".thumbcache")
}

/// Get the path to the config file (~/.thumbcache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.loader.loader_type, LoaderType::Http);
        assert_eq!(config.loader.timeout, DEFAULT_LOADER_TIMEOUT_SECS);
        assert_eq!(config.cache.memory_size, DEFAULT_MEMORY_CACHE_SIZE);
        assert_eq!(config.server.listen.port(), DEFAULT_LISTEN_PORT);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_orchestrator_config_zero_ttl_is_none() {
        let mut config = ConfigFile::default();
        config.cache.claim_ttl = 0;
        config.cache.failed_ttl = 30;

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.claim_ttl, None);
        assert_eq!(orchestrator.failed_ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_loader_config_http() {
        let config = ConfigFile::default();
        assert_eq!(
            config.loader_config().unwrap(),
            LoaderConfig::Http {
                timeout: Duration::from_secs(DEFAULT_LOADER_TIMEOUT_SECS),
                max_size: DEFAULT_LOADER_MAX_SIZE as u64,
            }
        );
    }

    #[test]
    fn test_loader_config_file_without_root() {
        let mut config = ConfigFile::default();
        config.loader.loader_type = LoaderType::File;
        assert!(config.loader_config().is_err());
    }

    #[test]
    fn test_render_limits_follow_settings() {
        let mut config = ConfigFile::default();
        config.render.max_width = 100;
        config.render.jpeg_quality = 50;

        let limits = config.render_limits();
        assert_eq!(limits.max_width, 100);
        assert_eq!(limits.jpeg_quality, 50);
    }
}
