//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::orchestrator::RenderMode;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete service configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// HTTP listener and response headers
    pub server: ServerSettings,
    /// Render limits and dispatch mode
    pub render: RenderSettings,
    /// Source loader settings
    pub loader: LoaderSettings,
    /// Cache backend and claim lifetimes
    pub cache: CacheSettings,
    /// Worker pool sizing (queued mode)
    pub workers: WorkerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address to bind
    pub listen: SocketAddr,
    /// `max-age` for rendered thumbnails in seconds; 0 omits `Cache-Control`
    pub response_max_age: u64,
    /// `max-age` for pending placeholders in seconds
    pub pending_max_age: u64,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Inline or queued dispatch
    pub mode: RenderMode,
    /// Largest output box width
    pub max_width: u32,
    /// Largest output box height
    pub max_height: u32,
    /// Largest accepted source width or height
    pub max_input_dimension: u32,
    /// JPEG output quality (1-100)
    pub jpeg_quality: u8,
}

/// Source transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderType {
    Http,
    File,
}

impl LoaderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderType::Http => "http",
            LoaderType::File => "file",
        }
    }
}

impl fmt::Display for LoaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoaderType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(LoaderType::Http),
            "file" => Ok(LoaderType::File),
            _ => Err(()),
        }
    }
}

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Transport: http or file
    pub loader_type: LoaderType,
    /// Request timeout in seconds (http only)
    pub timeout: u64,
    /// Maximum source size in bytes
    pub max_size: usize,
    /// Root directory (file only)
    pub root: Option<PathBuf>,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Memory backend size in bytes
    pub memory_size: usize,
    /// Seconds before an uncompleted claim expires; 0 = never
    pub claim_ttl: u64,
    /// Seconds a failed placeholder is kept; 0 = until evicted
    pub failed_ttl: u64,
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Number of render workers
    pub count: usize,
    /// Jobs allowed to wait for a worker
    pub queue_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingSettings {
    /// Log file path; `None` logs to stdout only
    pub file: Option<PathBuf>,
}
