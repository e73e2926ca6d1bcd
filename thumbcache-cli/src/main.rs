//! thumbcache CLI - Command-line interface
//!
//! This binary runs the thumbnail service and offers a few maintenance
//! commands on top of the thumbcache library.

mod commands;
mod error;
mod runner;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::render::RenderArgs;
use commands::serve::ServeArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "thumbcache")]
#[command(version = thumbcache::VERSION)]
#[command(about = "Get-or-render thumbnail cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP thumbnail service
    Serve {
        /// Configuration file (defaults to ~/.thumbcache/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding [server] listen
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Render one request path to a file without using the cache
    Render {
        /// Request path, e.g. fit-in/100x100/example.com/cat.png
        path: String,

        /// Where to write the thumbnail
        #[arg(long, short)]
        output: PathBuf,

        /// Configuration file (defaults to ~/.thumbcache/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Serve { config, listen } => {
            commands::serve::run(ServeArgs { config, listen })
        }
        Commands::Render {
            path,
            output,
            config,
        } => commands::render::run(RenderArgs {
            path,
            output,
            config,
        }),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
