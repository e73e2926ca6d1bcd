//! Render execution shared by inline and queued dispatch.

use crate::backend::Backend;
use crate::codec::ThumbRecord;
use crate::loader::{LoaderError, SourceLoader};
use crate::placeholder::Placeholders;
use crate::pool::{JobHandler, RenderJob};
use crate::render::{RenderEngine, RenderError};
use crate::request::RenderRequest;
use crate::status::ServiceStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Everything a claimed render needs to reach its terminal store.
pub struct RenderCore<L, B> {
    pub(crate) engine: RenderEngine<L>,
    pub(crate) backend: Arc<B>,
    pub(crate) placeholders: Placeholders,
    pub(crate) status: Arc<ServiceStatus>,
    pub(crate) failed_ttl: Option<Duration>,
    pub(crate) claim_ttl: Option<Duration>,
}

impl<L: SourceLoader, B: Backend> RenderCore<L, B> {
    /// Renders a claimed key and stores the outcome.
    ///
    /// Success stores the thumbnail with no expiry; any failure stores the
    /// failed placeholder with `failed_ttl`. The matching counter moves
    /// exactly once, after the store. Returns the record that was stored.
    pub async fn execute(&self, request: &RenderRequest) -> ThumbRecord {
        let key = request.cache_key();

        match self.engine.render(request).await {
            Ok(record) => {
                if self.store(key, &record, None).await {
                    self.status.record_generated();
                    return record;
                }
            }
            Err(e) => log_render_failure(key, request.source_url(), &e),
        }

        let failed = self.placeholders.failed();
        if !self.store(key, &failed, self.failed_ttl).await {
            error!(key, "Could not store failed placeholder; claim left to expire");
        }
        self.status.record_failed();
        failed
    }

    /// Re-stores the pending placeholder so the claim gets a full
    /// `claim_ttl` for the render itself.
    async fn refresh_claim(&self, key: &str) {
        if self.claim_ttl.is_none() {
            return;
        }
        let pending = self.placeholders.pending();
        if !self.store(key, &pending, self.claim_ttl).await {
            warn!(key, "Could not refresh claim; rendering under the original TTL");
        }
    }

    /// Encodes and stores `record`. Failures are logged here.
    async fn store(&self, key: &str, record: &ThumbRecord, ttl: Option<Duration>) -> bool {
        let bytes = match record.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(key, error = %e, "Could not encode record");
                return false;
            }
        };
        match self.backend.put(key, bytes, ttl).await {
            Ok(()) => true,
            Err(e) => {
                error!(key, backend = self.backend.name(), error = %e, "Backend put failed");
                false
            }
        }
    }
}

/// Transport failures and HTTP status failures are logged apart; both end
/// in the same stored placeholder.
fn log_render_failure(key: &str, url: &str, err: &RenderError) {
    match err {
        RenderError::Loader(e) if e.is_no_response() => warn!(
            key,
            url,
            stage = %e.stage(),
            error = %e,
            "Source fetch failed without a response"
        ),
        RenderError::Loader(LoaderError::Status { status, .. }) => warn!(
            key,
            url,
            status,
            "Source returned non-success status"
        ),
        other => warn!(key, url, kind = other.kind(), error = %other, "Render failed"),
    }
}

impl<L: SourceLoader, B: Backend> JobHandler for RenderCore<L, B> {
    /// Jobs whose claim may have expired are dropped unrendered: another
    /// request can already have re-claimed the key and queued its own job.
    async fn handle(&self, job: RenderJob) {
        let key = job.key();
        if job.claim_lapsed(self.claim_ttl) {
            warn!(
                key,
                claim_age_ms = job.claim_age().as_millis() as u64,
                queued_ms = job.queued_for().as_millis() as u64,
                "Claim expired while queued, dropping render job"
            );
            self.status.record_claim_expired();
            return;
        }
        self.refresh_claim(key).await;
        self.execute(&job.request).await;
    }
}
