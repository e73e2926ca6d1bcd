//! Service composition.
//!
//! [`ThumbService`] wires the loader, render engine, backend, placeholders
//! and status counters into one orchestrator. [`ThumbService::from_config`]
//! is the production path; [`ThumbService::new`] takes pre-built parts.

use crate::backend::{Backend, MemoryBackend};
use crate::codec::ThumbRecord;
use crate::config::{ConfigFile, ConfigFileError};
use crate::loader::{ConfiguredLoader, SourceLoader};
use crate::orchestrator::{OrchestratorConfig, OrchestratorError, StatusReport, ThumbOrchestrator};
use crate::placeholder::Placeholders;
use crate::render::{RenderEngine, RenderError};
use crate::status::ServiceStatus;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while assembling the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Failed to create the HTTP client
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Failed to encode the placeholder images
    #[error("Placeholder error: {0}")]
    Placeholder(#[from] image::ImageError),
}

/// HTTP caching hints applied to served records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePolicy {
    /// `max-age` for rendered thumbnails; 0 omits the header
    pub response_max_age: u64,
    /// `max-age` for pending placeholders
    pub pending_max_age: u64,
}

impl ResponsePolicy {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            response_max_age: config.server.response_max_age,
            pending_max_age: config.server.pending_max_age,
        }
    }
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self::from_config(&ConfigFile::default())
    }
}

/// The assembled thumbnail service.
pub struct ThumbService<L = ConfiguredLoader, B = MemoryBackend> {
    orchestrator: ThumbOrchestrator<L, B>,
    status: Arc<ServiceStatus>,
    policy: ResponsePolicy,
}

impl ThumbService {
    /// Builds the service described by `config` with an in-memory backend.
    ///
    /// Must be called inside a tokio runtime when the render mode is
    /// `queued`, since the worker pool is spawned here.
    pub fn from_config(config: &ConfigFile) -> Result<Self, ServiceError> {
        let loader_config = config.loader_config()?;
        let loader = ConfiguredLoader::from_config(&loader_config)?;
        let engine = RenderEngine::new(loader, config.render_limits());
        let backend = Arc::new(MemoryBackend::new(config.cache.memory_size));

        info!(
            loader = loader_config.name(),
            memory_size = config.cache.memory_size,
            "Building thumbnail service"
        );

        Self::new(
            engine,
            backend,
            config.orchestrator_config(),
            ResponsePolicy::from_config(config),
        )
    }
}

impl<L: SourceLoader, B: Backend> ThumbService<L, B> {
    /// Assembles a service from pre-built parts.
    pub fn new(
        engine: RenderEngine<L>,
        backend: Arc<B>,
        config: OrchestratorConfig,
        policy: ResponsePolicy,
    ) -> Result<Self, ServiceError> {
        let status = Arc::new(ServiceStatus::new());
        let orchestrator = ThumbOrchestrator::new(
            engine,
            backend,
            Placeholders::new()?,
            Arc::clone(&status),
            config,
        );

        Ok(Self {
            orchestrator,
            status,
            policy,
        })
    }

    /// Get-or-render for a request path (without the leading `/`).
    pub async fn thumbnail(&self, path: &str) -> Result<ThumbRecord, OrchestratorError> {
        self.orchestrator.get(path).await
    }

    /// Renders `path` directly, bypassing the backend.
    pub async fn render_uncached(&self, path: &str) -> Result<ThumbRecord, RenderError> {
        self.orchestrator.engine().render_key(path).await
    }

    pub fn report(&self) -> StatusReport {
        self.orchestrator.report()
    }

    pub fn status(&self) -> &ServiceStatus {
        &self.status
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    pub fn orchestrator(&self) -> &ThumbOrchestrator<L, B> {
        &self.orchestrator
    }

    /// Stops background workers, letting running renders finish.
    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
        info!("Thumbnail service stopped");
    }
}
