//! Get-or-render orchestration
//!
//! [`ThumbOrchestrator`] answers every thumbnail request: a backend hit is
//! decoded and served, a miss is claimed with `add_if_absent` and rendered
//! by exactly one caller. Two dispatch modes are available:
//!
//! - **Inline**: the claim winner spawns the render and waits for it;
//!   other requests in the same process wait on the same render.
//! - **Queued**: the claim winner hands a job to the bounded
//!   [`WorkerPool`](crate::pool::WorkerPool) and immediately serves the
//!   pending placeholder.
//!
//! Either way a failed render stores the failed placeholder, so a broken
//! source is not fetched again until that entry expires.

mod coalesce;
mod runner;
mod thumbs;

pub use coalesce::{CoalescerStats, LeaderTicket, Registration, RenderCoalescer, SharedRecord};
pub use thumbs::ThumbOrchestrator;

use crate::backend::{BackendError, BackendStats};
use crate::codec::CodecError;
use crate::pool::{PoolConfig, PoolSnapshot};
use crate::request::RequestError;
use crate::status::StatusSnapshot;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default lifetime of a claim that is never completed.
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(60);

/// How a claimed render is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Render in a detached task and wait for it
    #[default]
    Inline,
    /// Queue for the worker pool and serve the pending placeholder
    Queued,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Inline => "inline",
            RenderMode::Queued => "queued",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(RenderMode::Inline),
            "queued" => Ok(RenderMode::Queued),
            other => Err(format!("unknown render mode '{}' (expected inline or queued)", other)),
        }
    }
}

/// Orchestrator policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub mode: RenderMode,
    /// Expiry of the pending claim; `None` keeps it until overwritten
    pub claim_ttl: Option<Duration>,
    /// Expiry of a stored failed placeholder; `None` keeps it until evicted
    pub failed_ttl: Option<Duration>,
    /// Worker pool sizing (queued mode only)
    pub pool: PoolConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            claim_ttl: Some(DEFAULT_CLAIM_TTL),
            failed_ttl: None,
            pool: PoolConfig::default(),
        }
    }
}

/// Errors surfaced to the caller of [`ThumbOrchestrator::get`].
///
/// Render failures are not errors here: they produce the failed
/// placeholder record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// The request path is invalid; the backend was not consulted
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The backend failed; there is no local fallback
    #[error(transparent)]
    BackendUnavailable(#[from] BackendError),

    /// A record produced here could not be encoded
    #[error("Could not encode record: {0}")]
    Codec(#[from] CodecError),
}

impl OrchestratorError {
    /// True for errors caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OrchestratorError::Request(_))
    }
}

/// Everything `/status` reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub mode: RenderMode,
    pub thumbs: StatusSnapshot,
    pub cache: BackendStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<PoolSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coalescing: Option<CoalescerStats>,
}
