//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::net::{Ipv4Addr, SocketAddr};

use super::settings::*;
use crate::orchestrator::RenderMode;
use crate::pool::{PoolConfig, DEFAULT_QUEUE_CAPACITY};
use crate::render::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_INPUT_DIMENSION};

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default `max-age` for rendered thumbnails (1 day).
pub const DEFAULT_RESPONSE_MAX_AGE_SECS: u64 = 86_400;

/// Default `max-age` for pending placeholders.
pub const DEFAULT_PENDING_MAX_AGE_SECS: u64 = 2;

// =============================================================================
// Render defaults
// =============================================================================

/// Default maximum output width and height.
pub const DEFAULT_MAX_DIMENSION: u32 = 512;

// =============================================================================
// Loader defaults
// =============================================================================

/// Default loader timeout in seconds.
pub const DEFAULT_LOADER_TIMEOUT_SECS: u64 = 10;

/// Default maximum source size (20MB).
pub const DEFAULT_LOADER_MAX_SIZE: usize = 20 * 1024 * 1024;

// =============================================================================
// Cache defaults
// =============================================================================

/// Default memory backend size (256MB).
pub const DEFAULT_MEMORY_CACHE_SIZE: usize = 256 * 1024 * 1024;

/// Default claim lifetime in seconds.
pub const DEFAULT_CLAIM_TTL_SECS: u64 = 60;

/// Default failed placeholder lifetime in seconds (0 = until evicted).
pub const DEFAULT_FAILED_TTL_SECS: u64 = 0;

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_LISTEN_PORT)),
                response_max_age: DEFAULT_RESPONSE_MAX_AGE_SECS,
                pending_max_age: DEFAULT_PENDING_MAX_AGE_SECS,
            },
            render: RenderSettings {
                mode: RenderMode::Inline,
                max_width: DEFAULT_MAX_DIMENSION,
                max_height: DEFAULT_MAX_DIMENSION,
                max_input_dimension: DEFAULT_MAX_INPUT_DIMENSION,
                jpeg_quality: DEFAULT_JPEG_QUALITY,
            },
            loader: LoaderSettings {
                loader_type: LoaderType::Http,
                timeout: DEFAULT_LOADER_TIMEOUT_SECS,
                max_size: DEFAULT_LOADER_MAX_SIZE,
                root: None,
            },
            cache: CacheSettings {
                memory_size: DEFAULT_MEMORY_CACHE_SIZE,
                claim_ttl: DEFAULT_CLAIM_TTL_SECS,
                failed_ttl: DEFAULT_FAILED_TTL_SECS,
            },
            workers: WorkerSettings {
                count: PoolConfig::default_workers(),
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
            },
            logging: LoggingSettings::default(),
        }
    }
}
