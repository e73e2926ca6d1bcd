//! Filesystem source loader.

use super::types::{LoaderError, SourceLoader};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::trace;

/// Loads source images from a directory tree.
///
/// Identifiers are paths relative to `root`. Absolute paths and `..`
/// components are rejected so a request can never escape the root.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
    max_size: u64,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    /// Root directory that identifiers resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, identifier: &str) -> Result<PathBuf, LoaderError> {
        let relative = Path::new(identifier.trim_start_matches("file://"));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes || relative.as_os_str().is_empty() {
            return Err(LoaderError::InvalidRequest {
                identifier: identifier.to_string(),
                reason: "path must be relative and stay inside the loader root".to_string(),
            });
        }

        Ok(self.root.join(relative))
    }

    fn io_error(identifier: &str, e: std::io::Error) -> LoaderError {
        LoaderError::Io {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        }
    }
}

impl SourceLoader for FileLoader {
    async fn load(&self, identifier: &str) -> Result<Vec<u8>, LoaderError> {
        let path = self.resolve(identifier)?;
        trace!(path = %path.display(), "Loading source file");

        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Self::io_error(identifier, e))?;

        let advertised = file
            .metadata()
            .await
            .map_err(|e| Self::io_error(identifier, e))?
            .len();
        if advertised > self.max_size {
            return Err(LoaderError::TooLarge {
                identifier: identifier.to_string(),
                limit: self.max_size,
                observed: advertised,
            });
        }

        // The file may grow between stat and read; cap the read itself too.
        let mut body = Vec::with_capacity(advertised as usize);
        file.take(self.max_size + 1)
            .read_to_end(&mut body)
            .await
            .map_err(|e| Self::io_error(identifier, e))?;

        if body.len() as u64 > self.max_size {
            return Err(LoaderError::TooLarge {
                identifier: identifier.to_string(),
                limit: self.max_size,
                observed: body.len() as u64,
            });
        }

        Ok(body)
    }

    fn name(&self) -> &str {
        "file"
    }
}
