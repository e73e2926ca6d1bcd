//! Render request parsing and cache-key derivation.
//!
//! A request path looks like `fit-in/100x100/example.com/cat.png`: an
//! operation, a `WxH` size spec and the source URL. The canonical cache key
//! is derived from the operation, the clamped size and a SHA-256 of the URL,
//! so two paths that clamp to the same size share one cache entry.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// The only supported resize operation.
pub const OPERATION_FIT_IN: &str = "fit-in";

/// Upper bound on cache key length (memcached-style backends reject longer keys).
pub const MAX_KEY_LEN: usize = 250;

/// Client-side errors in a request path. Never reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Path does not have the `<operation>/<size>/<url>` shape
    #[error("Malformed key '{0}': expected <operation>/<WxH>/<source-url>")]
    MalformedKey(String),

    /// Operation other than `fit-in`
    #[error("Unsupported operation '{0}': only 'fit-in' is supported")]
    UnsupportedOperation(String),

    /// Size spec without an `x` separator
    #[error("Bad size spec '{0}': expected WxH")]
    BadSize(String),
}

/// Output size ceilings applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl SizeLimits {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }
}

/// A validated render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    path: String,
    source_url: String,
    width: u32,
    height: u32,
    cache_key: String,
}

impl RenderRequest {
    /// Parses a request path (without the leading `/`).
    ///
    /// Width and height are lenient: anything unparsable or below 1 becomes
    /// the configured maximum, anything above it is clamped down.
    pub fn parse(path: &str, limits: SizeLimits) -> Result<Self, RequestError> {
        let mut segments = path.splitn(3, '/');
        let (operation, size, source_url) =
            match (segments.next(), segments.next(), segments.next()) {
                (Some(op), Some(size), Some(url)) => (op, size, url),
                _ => return Err(RequestError::MalformedKey(path.to_string())),
            };

        if operation != OPERATION_FIT_IN {
            return Err(RequestError::UnsupportedOperation(operation.to_string()));
        }
        if source_url.is_empty() {
            return Err(RequestError::MalformedKey(path.to_string()));
        }

        let (width, height) = parse_size_spec(size, limits)?;
        let cache_key = cache_key(operation, width, height, source_url);

        Ok(Self {
            path: path.to_string(),
            source_url: source_url.to_string(),
            width,
            height,
            cache_key,
        })
    }

    /// The path as requested.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Identifier handed to the source loader.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Effective bounding-box width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Effective bounding-box height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Backend key for this request.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }
}

/// Splits a `WxH` spec at the first `x` and clamps both sides.
///
/// A spec without any `x` is rejected. Anything after the first `x` is the
/// height, so `1x2x3` is width 1 with an unparsable (maximum) height.
fn parse_size_spec(spec: &str, limits: SizeLimits) -> Result<(u32, u32), RequestError> {
    match spec.split_once('x') {
        Some((w, h)) => Ok((
            clamp_dimension(w, limits.max_width),
            clamp_dimension(h, limits.max_height),
        )),
        None => Err(RequestError::BadSize(spec.to_string())),
    }
}

/// Parses one dimension, falling back to `max` for invalid or out-of-range input.
pub fn clamp_dimension(value: &str, max: u32) -> u32 {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n.min(i64::from(max)) as u32,
        _ => max,
    }
}

/// Derives the backend key: `<operation>-<w>x<h>-<sha256(url) hex>`.
pub fn cache_key(operation: &str, width: u32, height: u32, source_url: &str) -> String {
    let digest = Sha256::digest(source_url.as_bytes());
    let mut key = format!("{}-{}x{}-{}", operation, width, height, hex::encode(digest));
    if key.len() > MAX_KEY_LEN {
        let mut cut = MAX_KEY_LEN;
        while !key.is_char_boundary(cut) {
            cut -= 1;
        }
        key.truncate(cut);
    }
    key
}
