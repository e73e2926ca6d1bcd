//! Errors surfaced by `thumbcache` subcommands, with hints and exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;
use thumbcache::config::ConfigFileError;
use thumbcache::render::RenderError;
use thumbcache::service::ServiceError;

/// Everything a subcommand can fail with.
#[derive(Debug)]
pub enum CliError {
    LoggingInit(String),
    Config(String),
    /// Loader, placeholders or orchestrator could not be built
    ServiceCreation(ServiceError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// One-shot render failed
    Render(RenderError),
    /// Rendered thumbnail could not be saved
    FileWrite { path: PathBuf, error: std::io::Error },
    /// HTTP server error
    Serve(std::io::Error),
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::ServiceCreation(ServiceError::Config(_)) => 2,
            CliError::Render(_) => 3,
            _ => 1,
        }
    }

    /// Prints the error (plus a hint where one helps) and exits.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Serve(_) => {
                eprintln!();
                eprintln!("Things to check:");
                eprintln!("  1. Address in use: pick another with --listen or [server] listen");
                eprintln!("  2. Permissions: ports below 1024 need elevated privileges");
            }
            CliError::Config(_) | CliError::ServiceCreation(ServiceError::Config(_)) => {
                eprintln!();
                eprintln!("Run 'thumbcache config init' to write a default configuration.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Could not set up logging: {}", msg),
            CliError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            CliError::ServiceCreation(e) => write!(f, "Could not build thumbnail service: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Render(e) => write!(f, "Render failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Serve(e) => write!(f, "HTTP server error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ServiceCreation(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Render(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Serve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::ServiceCreation(e)
    }
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        CliError::Render(e)
    }
}
