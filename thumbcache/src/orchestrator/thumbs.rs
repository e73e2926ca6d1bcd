//! The get-or-render entry point.

use super::coalesce::{Registration, RenderCoalescer, SharedRecord};
use super::runner::RenderCore;
use super::{OrchestratorConfig, OrchestratorError, RenderMode, StatusReport};
use crate::backend::Backend;
use crate::codec::ThumbRecord;
use crate::loader::SourceLoader;
use crate::placeholder::Placeholders;
use crate::pool::{RenderJob, WorkerPool};
use crate::render::RenderEngine;
use crate::request::{RenderRequest, SizeLimits};
use crate::status::ServiceStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

enum Dispatch {
    Inline(Arc<RenderCoalescer>),
    Queued(WorkerPool),
}

/// Serves thumbnails from the backend, rendering each key at most once.
///
/// Per key the backend moves through `Absent -> Claimed -> Stored`. The
/// claim is an `add_if_absent` of an encoded pending placeholder, so a
/// reader that finds it simply serves it. Whoever wins the claim renders
/// (inline) or queues the render (queued); everyone else gets the pending
/// placeholder.
pub struct ThumbOrchestrator<L, B> {
    core: Arc<RenderCore<L, B>>,
    dispatch: Dispatch,
    limits: SizeLimits,
    claim_ttl: Option<Duration>,
}

impl<L: SourceLoader, B: Backend> ThumbOrchestrator<L, B> {
    /// Wires the orchestrator. Queued mode spawns the worker pool, so this
    /// must be called inside a tokio runtime.
    pub fn new(
        engine: RenderEngine<L>,
        backend: Arc<B>,
        placeholders: Placeholders,
        status: Arc<ServiceStatus>,
        config: OrchestratorConfig,
    ) -> Self {
        let limits = engine.limits().size_limits();
        let core = Arc::new(RenderCore {
            engine,
            backend,
            placeholders,
            status,
            failed_ttl: config.failed_ttl,
            claim_ttl: config.claim_ttl,
        });

        let dispatch = match config.mode {
            RenderMode::Inline => Dispatch::Inline(Arc::new(RenderCoalescer::new())),
            RenderMode::Queued => Dispatch::Queued(WorkerPool::start(Arc::clone(&core), config.pool)),
        };

        info!(
            mode = config.mode.as_str(),
            backend = core.backend.name(),
            loader = core.engine.loader().name(),
            "Thumbnail orchestrator ready"
        );

        Self {
            core,
            dispatch,
            limits,
            claim_ttl: config.claim_ttl,
        }
    }

    pub fn mode(&self) -> RenderMode {
        match self.dispatch {
            Dispatch::Inline(_) => RenderMode::Inline,
            Dispatch::Queued(_) => RenderMode::Queued,
        }
    }

    pub fn backend(&self) -> &B {
        &self.core.backend
    }

    pub fn status(&self) -> &ServiceStatus {
        &self.core.status
    }

    pub fn engine(&self) -> &RenderEngine<L> {
        &self.core.engine
    }

    /// Returns the record for `path`, rendering it if nobody has yet.
    ///
    /// Client errors in the path are returned before the backend is
    /// touched. The returned record may be a pending or failed placeholder.
    pub async fn get(&self, path: &str) -> Result<ThumbRecord, OrchestratorError> {
        let status = &self.core.status;
        status.record_request();
        let _in_flight = status.enter();

        let request = RenderRequest::parse(path, self.limits)?;
        let key = request.cache_key();

        if let Some(record) = self.lookup(key).await? {
            debug!(key, kind = record.kind.as_str(), "Cache hit");
            return Ok(record);
        }

        match &self.dispatch {
            Dispatch::Inline(coalescer) => self.render_inline(coalescer, request).await,
            Dispatch::Queued(pool) => self.render_queued(pool, request).await,
        }
    }

    /// Reads and decodes `key`. Undecodable values are removed and count
    /// as a miss.
    async fn lookup(&self, key: &str) -> Result<Option<ThumbRecord>, OrchestratorError> {
        let backend = &self.core.backend;
        let bytes = match backend.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!(key, backend = backend.name(), error = %e, "Backend get failed");
                return Err(e.into());
            }
        };

        match ThumbRecord::decode(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key, error = %e, len = bytes.len(), "Corrupt cache record, treating as miss");
                self.core.status.record_corrupt_record();
                if let Err(e) = backend.remove(key).await {
                    warn!(key, error = %e, "Could not remove corrupt record");
                }
                Ok(None)
            }
        }
    }

    /// Takes the backend claim. Returns the pending placeholder that was
    /// stored (or would have been) and whether this caller owns the key.
    async fn claim(&self, key: &str) -> Result<(ThumbRecord, bool), OrchestratorError> {
        let pending = self.core.placeholders.pending();
        let backend = &self.core.backend;
        match backend.add_if_absent(key, pending.encode()?, self.claim_ttl).await {
            Ok(claimed) => Ok((pending, claimed)),
            Err(e) => {
                error!(key, backend = backend.name(), error = %e, "Backend claim failed");
                Err(e.into())
            }
        }
    }

    async fn render_inline(
        &self,
        coalescer: &Arc<RenderCoalescer>,
        request: RenderRequest,
    ) -> Result<ThumbRecord, OrchestratorError> {
        let key = request.cache_key().to_string();

        let (ticket, receiver) = match coalescer.register(&key) {
            Registration::Follower(receiver) => {
                let pending = self.core.placeholders.pending();
                return Ok(await_render(receiver, pending).await);
            }
            Registration::Leader { ticket, receiver } => (ticket, receiver),
        };

        // Dropping the ticket on any early return releases the waiters.
        let (pending, claimed) = self.claim(&key).await?;
        if !claimed {
            debug!(key, "Key claimed elsewhere, serving pending placeholder");
            return Ok(pending);
        }

        // Detached so a dropped request never cancels the render.
        let core = Arc::clone(&self.core);
        tokio::spawn(async move {
            let record = core.execute(&request).await;
            ticket.complete(Arc::new(record));
        });

        Ok(await_render(receiver, pending).await)
    }

    async fn render_queued(
        &self,
        pool: &WorkerPool,
        request: RenderRequest,
    ) -> Result<ThumbRecord, OrchestratorError> {
        let key = request.cache_key().to_string();

        let claimed_at = Instant::now();
        let (pending, claimed) = self.claim(&key).await?;
        if !claimed {
            debug!(key, "Key already claimed, serving pending placeholder");
            return Ok(pending);
        }

        match pool.try_submit(RenderJob::claimed(request, claimed_at)) {
            Ok(()) => debug!(key, queued = pool.queued(), "Render job queued"),
            Err(e) => {
                warn!(key, error = %e, "Abandoning claim");
                if let Err(e) = self.core.backend.remove(&key).await {
                    // The claim TTL still bounds how long the key stays pending
                    warn!(key, error = %e, "Could not release abandoned claim");
                }
                self.core.status.record_claim_abandoned();
            }
        }
        Ok(pending)
    }

    /// Status counters, backend statistics and worker state.
    pub fn report(&self) -> StatusReport {
        let (workers, coalescing) = match &self.dispatch {
            Dispatch::Inline(coalescer) => (None, Some(coalescer.stats())),
            Dispatch::Queued(pool) => (Some(pool.snapshot()), None),
        };
        StatusReport {
            mode: self.mode(),
            thumbs: self.core.status.snapshot(),
            cache: self.core.backend.stats(),
            workers,
            coalescing,
        }
    }

    /// Stops the worker pool, letting running jobs finish.
    pub async fn shutdown(&self) {
        if let Dispatch::Queued(pool) = &self.dispatch {
            pool.shutdown().await;
        }
    }
}

async fn await_render(
    mut receiver: broadcast::Receiver<SharedRecord>,
    pending: ThumbRecord,
) -> ThumbRecord {
    match receiver.recv().await {
        Ok(record) => ThumbRecord::clone(&record),
        // Render abandoned before completing
        Err(_) => pending,
    }
}
