//! Renders a `ConfigFile` back to annotated INI text.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Every key is written, each preceded by a `;` comment line.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let root = config
        .loader
        .root
        .as_deref()
        .map(display_path)
        .unwrap_or_default();
    let log_file = config
        .logging
        .file
        .as_deref()
        .map(display_path)
        .unwrap_or_default();

    format!(
        r#"[server]
; Address and port to listen on
listen = {}
; Cache-Control max-age in seconds for rendered thumbnails (0 = no header)
response_max_age = {}
; Cache-Control max-age in seconds for pending placeholders, so clients re-poll soon
pending_max_age = {}

[render]
; How a claimed render runs:
;   inline - render in the background and answer once it is done
;   queued - hand it to the worker pool and answer with a placeholder at once
mode = {}
; Largest thumbnail box; larger requests are clamped to it
max_width = {}
max_height = {}
; Sources wider or taller than this are rejected before decoding
max_input_dimension = {}
; JPEG output quality, 1-100
jpeg_quality = {}

[loader]
; Where source images come from:
;   http - fetch the URL in the request path
;   file - read the path from the directory given by 'root'
type = {}
; Timeout in seconds for a source fetch (http only)
timeout = {}
; Largest accepted source. Supports: KB, MB, GB suffixes
max_size = {}
; Root directory for the file loader
root = {}

[cache]
; In-memory cache size. Supports: KB, MB, GB suffixes
memory_size = {}
; Seconds before an unfinished render claim expires (0 = never; otherwise
; must be longer than [loader] timeout)
claim_ttl = {}
; Seconds a failed render is remembered before it may be retried (0 = until evicted)
failed_ttl = {}

[workers]
; Render workers in queued mode (default: number of CPU cores)
count = {}
; Jobs allowed to wait for a worker; when full, requests get a placeholder
queue_capacity = {}

[logging]
; Log file path. If empty, logs go to stdout only
file = {}
"#,
        config.server.listen,
        config.server.response_max_age,
        config.server.pending_max_age,
        config.render.mode,
        config.render.max_width,
        config.render.max_height,
        config.render.max_input_dimension,
        config.render.jpeg_quality,
        config.loader.loader_type,
        config.loader.timeout,
        format_size(config.loader.max_size),
        root,
        format_size(config.cache.memory_size),
        config.cache.claim_ttl,
        config.cache.failed_ttl,
        config.workers.count,
        config.workers.queue_capacity,
        log_file,
    )
}

/// Writes paths under the home directory with a `~/` prefix.
fn display_path(path: &Path) -> String {
    let relative = dirs::home_dir()
        .and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf));
    match relative {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
