//! Async render entry point.

use super::transform::render_bytes;
use super::{RenderError, RenderLimits};
use crate::codec::ThumbRecord;
use crate::loader::SourceLoader;
use crate::request::RenderRequest;
use tracing::{debug, info};

/// Renders thumbnails from an injected [`SourceLoader`].
///
/// Loading is async; decoding, resizing and encoding run on the blocking
/// pool so request tasks never stall behind CPU work. A failure at any
/// stage is returned as-is: the engine never retries.
pub struct RenderEngine<L> {
    loader: L,
    limits: RenderLimits,
}

impl<L: SourceLoader> RenderEngine<L> {
    pub fn new(loader: L, limits: RenderLimits) -> Self {
        Self { loader, limits }
    }

    pub fn limits(&self) -> &RenderLimits {
        &self.limits
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Parses `path` and renders it.
    pub async fn render_key(&self, path: &str) -> Result<ThumbRecord, RenderError> {
        let request = RenderRequest::parse(path, self.limits.size_limits())?;
        self.render(&request).await
    }

    /// Renders an already-parsed request.
    pub async fn render(&self, request: &RenderRequest) -> Result<ThumbRecord, RenderError> {
        let url = request.source_url();
        debug!(url, loader = self.loader.name(), "Loading source image");
        let bytes = self.loader.load(url).await?;

        let limits = self.limits;
        let (box_w, box_h) = (request.width(), request.height());
        let rendered =
            tokio::task::spawn_blocking(move || render_bytes(&bytes, box_w, box_h, &limits))
                .await
                .map_err(|e| RenderError::Join(e.to_string()))??;

        info!(
            url,
            source = %format!(
                "{}x{} {:?}",
                rendered.source_width, rendered.source_height, rendered.source_format
            ),
            output = %format!("{}x{} {}", rendered.width, rendered.height, rendered.mime),
            bytes = rendered.data.len(),
            "Rendered thumbnail"
        );

        Ok(ThumbRecord::rendered(
            rendered.width as i32,
            rendered.height as i32,
            rendered.mime,
            rendered.data,
        ))
    }
}
