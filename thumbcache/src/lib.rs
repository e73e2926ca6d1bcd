//! thumbcache - get-or-render thumbnail cache
//!
//! Serves resized thumbnails of remote images out of a key/value cache,
//! rendering each distinct request at most once no matter how many clients
//! ask for it concurrently.
//!
//! # High-Level API
//!
//! The [`service`] module wires everything together and the [`server`]
//! module puts it behind HTTP:
//!
//! ```ignore
//! use std::sync::Arc;
//! use thumbcache::config::ConfigFile;
//! use thumbcache::service::ThumbService;
//!
//! let config = ConfigFile::load()?;
//! let service = Arc::new(ThumbService::from_config(&config)?);
//! let record = service.thumbnail("fit-in/100x100/example.com/cat.png").await?;
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod loader;
pub mod logging;
pub mod orchestrator;
pub mod placeholder;
pub mod pool;
pub mod render;
pub mod request;
pub mod server;
pub mod service;
pub mod status;

/// Version of the thumbcache library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
