//! Loader trait and error types

use std::fmt;
use std::future::Future;

/// Stage of a fetch at which it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Building the request (bad URL, unsupported scheme, bad path)
    Request,
    /// Connect, TLS or read failure on the wire
    Transport,
    /// Request did not complete within the configured timeout
    Timeout,
    /// Server answered with a non-2xx status
    Status,
    /// Payload exceeds the configured size ceiling
    TooLarge,
    /// Local I/O failure (file loader)
    Io,
}

impl LoadStage {
    /// Returns a string representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStage::Request => "request",
            LoadStage::Transport => "transport",
            LoadStage::Timeout => "timeout",
            LoadStage::Status => "status",
            LoadStage::TooLarge => "too_large",
            LoadStage::Io => "io",
        }
    }

    /// True for failures decided by local policy rather than the network.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, LoadStage::Request | LoadStage::TooLarge)
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while loading source bytes.
///
/// Every variant carries the identifier that was being fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// Request could not be constructed
    InvalidRequest { identifier: String, reason: String },
    /// Request timed out
    Timeout { identifier: String, reason: String },
    /// Connection or read failure
    Transport { identifier: String, reason: String },
    /// Non-success HTTP status
    Status { identifier: String, status: u16 },
    /// Payload larger than allowed
    TooLarge {
        identifier: String,
        limit: u64,
        observed: u64,
    },
    /// Local I/O failure
    Io { identifier: String, reason: String },
}

impl LoaderError {
    /// Stage at which the load failed.
    pub fn stage(&self) -> LoadStage {
        match self {
            LoaderError::InvalidRequest { .. } => LoadStage::Request,
            LoaderError::Timeout { .. } => LoadStage::Timeout,
            LoaderError::Transport { .. } => LoadStage::Transport,
            LoaderError::Status { .. } => LoadStage::Status,
            LoaderError::TooLarge { .. } => LoadStage::TooLarge,
            LoaderError::Io { .. } => LoadStage::Io,
        }
    }

    /// Identifier that was being loaded.
    pub fn identifier(&self) -> &str {
        match self {
            LoaderError::InvalidRequest { identifier, .. }
            | LoaderError::Timeout { identifier, .. }
            | LoaderError::Transport { identifier, .. }
            | LoaderError::Status { identifier, .. }
            | LoaderError::TooLarge { identifier, .. }
            | LoaderError::Io { identifier, .. } => identifier,
        }
    }

    /// True when no response was received at all.
    pub fn is_no_response(&self) -> bool {
        matches!(
            self,
            LoaderError::Timeout { .. } | LoaderError::Transport { .. }
        )
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::InvalidRequest { identifier, reason } => {
                write!(f, "request: {} ({})", reason, identifier)
            }
            LoaderError::Timeout { identifier, reason } => {
                write!(f, "timeout: {} ({})", reason, identifier)
            }
            LoaderError::Transport { identifier, reason } => {
                write!(f, "transport: {} ({})", reason, identifier)
            }
            LoaderError::Status { identifier, status } => {
                write!(f, "status: HTTP {} ({})", status, identifier)
            }
            LoaderError::TooLarge {
                identifier,
                limit,
                observed,
            } => write!(
                f,
                "too_large: {} bytes exceeds limit of {} ({})",
                observed, limit, identifier
            ),
            LoaderError::Io { identifier, reason } => {
                write!(f, "io: {} ({})", reason, identifier)
            }
        }
    }
}

impl std::error::Error for LoaderError {}

/// Source of raw image bytes.
///
/// The concrete transport is chosen at startup and injected into the
/// render engine; nothing looks loaders up by name at runtime.
pub trait SourceLoader: Send + Sync + 'static {
    /// Fetches the bytes behind `identifier`, bounded in time and size.
    fn load(&self, identifier: &str) -> impl Future<Output = Result<Vec<u8>, LoaderError>> + Send;

    /// Returns the loader's name for logging and identification.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let err = LoaderError::Status {
            identifier: "http://a/b.png".to_string(),
            status: 500,
        };
        assert_eq!(err.stage(), LoadStage::Status);
        assert_eq!(err.identifier(), "http://a/b.png");
        assert!(!err.is_no_response());
    }

    #[test]
    fn test_transport_and_timeout_have_no_response() {
        let transport = LoaderError::Transport {
            identifier: "x".to_string(),
            reason: "connection refused".to_string(),
        };
        let timeout = LoaderError::Timeout {
            identifier: "x".to_string(),
            reason: "deadline".to_string(),
        };
        assert!(transport.is_no_response());
        assert!(timeout.is_no_response());
    }

    #[test]
    fn test_policy_rejections() {
        assert!(LoadStage::TooLarge.is_policy_rejection());
        assert!(LoadStage::Request.is_policy_rejection());
        assert!(!LoadStage::Transport.is_policy_rejection());
    }

    #[test]
    fn test_display_names_stage_and_identifier() {
        let err = LoaderError::TooLarge {
            identifier: "http://a/big.jpg".to_string(),
            limit: 10,
            observed: 11,
        };
        let text = err.to_string();
        assert!(text.starts_with("too_large"));
        assert!(text.contains("http://a/big.jpg"));
    }
}
