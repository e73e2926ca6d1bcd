//! Loader selection from configuration.

use super::file::FileLoader;
use super::http::HttpLoader;
use super::types::{LoaderError, SourceLoader};
use std::path::PathBuf;
use std::time::Duration;

/// Which transport to fetch source images with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderConfig {
    /// Fetch over HTTP(S)
    Http { timeout: Duration, max_size: u64 },
    /// Read from a directory tree
    File { root: PathBuf, max_size: u64 },
}

impl LoaderConfig {
    /// Short name used in logs and config files.
    pub fn name(&self) -> &'static str {
        match self {
            LoaderConfig::Http { .. } => "http",
            LoaderConfig::File { .. } => "file",
        }
    }

    /// Payload ceiling regardless of transport.
    pub fn max_size(&self) -> u64 {
        match self {
            LoaderConfig::Http { max_size, .. } | LoaderConfig::File { max_size, .. } => *max_size,
        }
    }
}

/// A loader chosen at startup.
///
/// Enum dispatch keeps the render engine generic over one concrete type
/// while the transport stays a configuration choice.
#[derive(Clone)]
pub enum ConfiguredLoader {
    Http(HttpLoader),
    File(FileLoader),
}

impl ConfiguredLoader {
    /// Builds the loader described by `config`.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be constructed (TLS backend
    /// initialisation).
    pub fn from_config(config: &LoaderConfig) -> Result<Self, reqwest::Error> {
        match config {
            LoaderConfig::Http { timeout, max_size } => {
                Ok(Self::Http(HttpLoader::new(*timeout, *max_size)?))
            }
            LoaderConfig::File { root, max_size } => {
                Ok(Self::File(FileLoader::new(root.clone(), *max_size)))
            }
        }
    }
}

impl SourceLoader for ConfiguredLoader {
    async fn load(&self, identifier: &str) -> Result<Vec<u8>, LoaderError> {
        match self {
            Self::Http(l) => l.load(identifier).await,
            Self::File(l) => l.load(identifier).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Http(l) => l.name(),
            Self::File(l) => l.name(),
        }
    }
}
