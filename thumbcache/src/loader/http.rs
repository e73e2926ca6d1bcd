//! HTTP source loader

use super::types::{LoaderError, SourceLoader};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// User-Agent sent with every source fetch.
const USER_AGENT: &str = concat!("thumbcache/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default payload ceiling (20 MB).
pub const DEFAULT_MAX_SIZE: u64 = 20 * 1024 * 1024;

/// Loads source images over HTTP(S) with a timeout and a size ceiling.
///
/// The body is never buffered past `max_size`: an advertised
/// `Content-Length` above the ceiling is rejected before any body bytes are
/// read, and a streamed body is abandoned as soon as it grows past it.
#[derive(Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
    max_size: u64,
}

impl HttpLoader {
    /// Creates a loader with the given timeout and maximum payload size.
    ///
    /// The timeout applies to connecting (including the TLS handshake) and
    /// to the request as a whole.
    pub fn new(timeout: Duration, max_size: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self { client, max_size })
    }

    /// Maximum accepted payload in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Turns an identifier into a fetchable URL.
    ///
    /// Identifiers without a scheme are treated as `http://`. Only a `://`
    /// ahead of the first path, query or fragment delimiter counts as one.
    fn request_url(&self, identifier: &str) -> Result<Url, LoaderError> {
        let has_scheme = identifier
            .find("://")
            .is_some_and(|at| !identifier[..at].contains(['/', '?', '#']));
        let candidate = if has_scheme {
            identifier.to_string()
        } else {
            format!("http://{}", identifier)
        };

        let url = Url::parse(&candidate).map_err(|e| LoaderError::InvalidRequest {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(LoaderError::InvalidRequest {
                identifier: identifier.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    fn too_large(&self, identifier: &str, observed: u64) -> LoaderError {
        LoaderError::TooLarge {
            identifier: identifier.to_string(),
            limit: self.max_size,
            observed,
        }
    }
}

/// Maps a reqwest failure onto the loader's error stages.
fn classify(identifier: &str, e: reqwest::Error) -> LoaderError {
    if e.is_timeout() {
        LoaderError::Timeout {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        }
    } else if e.is_builder() {
        LoaderError::InvalidRequest {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        }
    } else {
        LoaderError::Transport {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        }
    }
}

impl SourceLoader for HttpLoader {
    async fn load(&self, identifier: &str) -> Result<Vec<u8>, LoaderError> {
        let url = self.request_url(identifier)?;
        trace!(url = %url, "HTTP GET request starting");

        let mut response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = identifier,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(classify(identifier, e));
            }
        };

        let status = response.status();
        debug!(url = identifier, status = status.as_u16(), "HTTP response received");
        if !status.is_success() {
            return Err(LoaderError::Status {
                identifier: identifier.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(advertised) = response.content_length() {
            if advertised > self.max_size {
                return Err(self.too_large(identifier, advertised));
            }
        }

        let capacity = response.content_length().unwrap_or(0).min(self.max_size) as usize;
        let mut body = Vec::with_capacity(capacity);

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify(identifier, e))?
        {
            let total = body.len() as u64 + chunk.len() as u64;
            if total > self.max_size {
                return Err(self.too_large(identifier, total));
            }
            body.extend_from_slice(&chunk);
        }

        trace!(url = identifier, bytes = body.len(), "HTTP response body read");
        Ok(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}
