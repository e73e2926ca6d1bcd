//! Render engine
//!
//! Turns a request path into a finished [`ThumbRecord`](crate::codec::ThumbRecord):
//! parse, load, check the header, decode, fit-in resize with nearest-neighbour
//! sampling, and encode back into the source's format family.

mod engine;
mod transform;

pub use engine::RenderEngine;
pub use transform::{fit_within, output_mime, render_bytes, RenderedImage};

use crate::loader::LoaderError;
use crate::request::{RequestError, SizeLimits};
use thiserror::Error;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Default ceiling on either input dimension.
pub const DEFAULT_MAX_INPUT_DIMENSION: u32 = 4096;

/// Bounds applied to every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLimits {
    /// Largest output box width
    pub max_width: u32,
    /// Largest output box height
    pub max_height: u32,
    /// Largest accepted source width or height
    pub max_input_dimension: u32,
    /// JPEG quality, clamped to 1..=100 when encoding
    pub jpeg_quality: u8,
}

impl RenderLimits {
    /// Size limits used when parsing request paths.
    pub fn size_limits(&self) -> SizeLimits {
        SizeLimits::new(self.max_width, self.max_height)
    }
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_width: 512,
            max_height: 512,
            max_input_dimension: DEFAULT_MAX_INPUT_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Errors that can occur while rendering a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Malformed key, unsupported operation or bad size
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Source could not be fetched
    #[error("Load failed: {0}")]
    Loader(#[from] LoaderError),

    /// Source bytes are not a decodable JPEG, PNG or GIF
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Source header reports dimensions above the configured ceiling
    #[error("Input too large: {width}x{height} exceeds {limit}")]
    InputTooLarge { width: u32, height: u32, limit: u32 },

    /// Resized image could not be encoded
    #[error("Encode failed: {0}")]
    Encode(String),

    /// The blocking render task panicked or was cancelled
    #[error("Render task failed: {0}")]
    Join(String),
}

impl RenderError {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Request(RequestError::MalformedKey(_)) => "malformed_key",
            RenderError::Request(RequestError::UnsupportedOperation(_)) => "unsupported_operation",
            RenderError::Request(RequestError::BadSize(_)) => "bad_size",
            RenderError::Loader(e) => match e {
                LoaderError::Timeout { .. } => "loader_timeout",
                LoaderError::Transport { .. } => "loader_transport_failure",
                LoaderError::Status { .. } => "loader_non_success_status",
                LoaderError::TooLarge { .. } => "loader_too_large",
                LoaderError::InvalidRequest { .. } | LoaderError::Io { .. } => "loader_failure",
            },
            RenderError::Decode(_) => "decode_failure",
            RenderError::InputTooLarge { .. } => "input_too_large",
            RenderError::Encode(_) => "encode_failure",
            RenderError::Join(_) => "render_task_failure",
        }
    }
}
