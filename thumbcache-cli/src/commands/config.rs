//! Configuration management CLI commands.
//!
//! Provides `config init` to write a commented default file and
//! `config show` to print the effective configuration.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use thumbcache::config::{config_file_path, ConfigFile};

use crate::error::CliError;
use crate::runner::load_config;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Where to write the file (defaults to ~/.thumbcache/config.ini)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Configuration file to read
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { path, force } => {
            let path = path.unwrap_or_else(config_file_path);
            run_init(&path, force)
        }
        ConfigCommands::Show { config } => run_show(config.as_deref()),
    }
}

/// Write the default configuration to `path`.
fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "'{}' already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Print the configuration that `serve` would run with.
fn run_show(config: Option<&Path>) -> Result<(), CliError> {
    let (config, path) = load_config(config)?;
    println!("# {}", path.display());
    print!("{}", config.to_config_string());
    Ok(())
}
