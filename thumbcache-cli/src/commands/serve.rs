//! Serve command - run the HTTP thumbnail service until ctrl-c.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thumbcache::config::ConfigFile;
use thumbcache::server;
use thumbcache::service::ThumbService;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub config: Option<PathBuf>,
    pub listen: Option<SocketAddr>,
}

/// Run the serve command.
pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let mut runner = CliRunner::new(args.config.as_deref())?;
    runner.log_startup("serve");

    // CLI > config
    if let Some(listen) = args.listen {
        runner.config_mut().server.listen = listen;
    }

    let config = runner.config().clone();
    runner.runtime()?.block_on(serve(config))
}

async fn serve(config: ConfigFile) -> Result<(), CliError> {
    let service = Arc::new(ThumbService::from_config(&config)?);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received ctrl-c, shutting down"),
            Err(e) => warn!(error = %e, "Could not listen for ctrl-c, shutting down"),
        }
        signal.cancel();
    });

    println!("thumbcache listening on http://{}", config.server.listen);
    println!("Press Ctrl+C to stop");

    server::bind_and_serve(config.server.listen, service, shutdown)
        .await
        .map_err(CliError::Serve)
}
