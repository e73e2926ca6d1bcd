//! Source image loaders
//!
//! A [`SourceLoader`] turns a source identifier into raw bytes, bounded in
//! time and in size. Two transports are provided:
//!
//! - [`HttpLoader`] fetches over HTTP(S) with reqwest
//! - [`FileLoader`] reads from a directory tree
//!
//! [`ConfiguredLoader`] wraps whichever one the configuration selects.
//!
//! ```ignore
//! use thumbcache::loader::{ConfiguredLoader, LoaderConfig, SourceLoader};
//!
//! let loader = ConfiguredLoader::from_config(&LoaderConfig::Http {
//!     timeout: Duration::from_secs(10),
//!     max_size: 20 * 1024 * 1024,
//! })?;
//! let bytes = loader.load("example.com/cat.png").await?;
//! ```

mod configured;
mod file;
mod http;
mod types;

pub use configured::{ConfiguredLoader, LoaderConfig};
pub use file::FileLoader;
pub use http::{HttpLoader, DEFAULT_MAX_SIZE, DEFAULT_TIMEOUT};
pub use types::{LoadStage, LoaderError, SourceLoader};
