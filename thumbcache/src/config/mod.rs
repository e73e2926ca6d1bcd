//! Service configuration
//!
//! Configuration lives in an INI file (default `~/.thumbcache/config.ini`).
//! Every key has a default, so a missing file or a partial one is valid.
//!
//! ```
//! use thumbcache::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let limits = config.render_limits();
//! assert_eq!(limits.max_width, 512);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LoaderSettings, LoaderType, LoggingSettings, RenderSettings,
    ServerSettings, WorkerSettings,
};
pub use size::{format_size, parse_size, SizeParseError};
