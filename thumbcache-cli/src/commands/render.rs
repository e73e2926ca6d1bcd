//! Render command - render one request path to a file, bypassing the cache.

use std::path::PathBuf;

use thumbcache::loader::ConfiguredLoader;
use thumbcache::render::RenderEngine;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the render command.
pub struct RenderArgs {
    pub path: String,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
}

/// Run the render command.
pub fn run(args: RenderArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref())?;
    runner.log_startup("render");
    let config = runner.config();

    let loader_config = config.loader_config()?;
    let loader = ConfiguredLoader::from_config(&loader_config)
        .map_err(|e| CliError::ServiceCreation(e.into()))?;
    let engine = RenderEngine::new(loader, config.render_limits());

    let path = args.path.trim_start_matches('/');
    let record = runner.runtime()?.block_on(engine.render_key(path))?;

    std::fs::write(&args.output, &record.data).map_err(|e| CliError::FileWrite {
        path: args.output.clone(),
        error: e,
    })?;

    info!(
        output = %args.output.display(),
        width = record.width,
        height = record.height,
        bytes = record.data.len(),
        "Thumbnail written"
    );
    println!(
        "Saved {}x{} {} ({} bytes) to {}",
        record.width,
        record.height,
        record.mime,
        record.data.len(),
        args.output.display()
    );

    Ok(())
}
