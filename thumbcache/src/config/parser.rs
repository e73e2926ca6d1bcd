//! Maps INI sections and keys onto [`ConfigFile`] fields, validating each
//! value as it goes.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::{ConfigFile, LoaderType};
use super::size::parse_size;
use crate::orchestrator::RenderMode;

/// Overlays every recognised key onto the defaults.
///
/// Unknown sections and keys are ignored; the first bad value aborts.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("listen") {
            config.server.listen = v.trim().parse().map_err(|_| {
                invalid("server", "listen", v, "expected an address like 127.0.0.1:8080")
            })?;
        }
        if let Some(v) = section.get("response_max_age") {
            config.server.response_max_age =
                parse_number(v, "server", "response_max_age", "must be a non-negative integer (seconds)")?;
        }
        if let Some(v) = section.get("pending_max_age") {
            config.server.pending_max_age =
                parse_number(v, "server", "pending_max_age", "must be a non-negative integer (seconds)")?;
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = section.get("mode") {
            config.render.mode = v
                .parse::<RenderMode>()
                .map_err(|_| invalid("render", "mode", v, "must be 'inline' or 'queued'"))?;
        }
        if let Some(v) = section.get("max_width") {
            config.render.max_width = parse_positive(v, "render", "max_width")?;
        }
        if let Some(v) = section.get("max_height") {
            config.render.max_height = parse_positive(v, "render", "max_height")?;
        }
        if let Some(v) = section.get("max_input_dimension") {
            config.render.max_input_dimension = parse_positive(v, "render", "max_input_dimension")?;
        }
        if let Some(v) = section.get("jpeg_quality") {
            let quality: u8 =
                parse_number(v, "render", "jpeg_quality", "must be an integer between 1 and 100")?;
            if !(1..=100).contains(&quality) {
                return Err(invalid(
                    "render",
                    "jpeg_quality",
                    v,
                    "must be an integer between 1 and 100",
                ));
            }
            config.render.jpeg_quality = quality;
        }
    }

    // [loader] section
    if let Some(section) = ini.section(Some("loader")) {
        if let Some(v) = section.get("type") {
            config.loader.loader_type = v
                .parse::<LoaderType>()
                .map_err(|_| invalid("loader", "type", v, "must be 'http' or 'file'"))?;
        }
        if let Some(v) = section.get("timeout") {
            config.loader.timeout = parse_positive(v, "loader", "timeout")?;
        }
        if let Some(v) = section.get("max_size") {
            config.loader.max_size = parse_size(v).map_err(|_| {
                invalid("loader", "max_size", v, "expected format like '20MB', '512KB', or '1GB'")
            })?;
        }
        if let Some(v) = section.get("root") {
            let v = v.trim();
            if !v.is_empty() {
                config.loader.root = Some(expand_tilde(v));
            }
        }
    }

    if config.loader.loader_type == LoaderType::File && config.loader.root.is_none() {
        return Err(invalid("loader", "root", "", "required when type = file"));
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size = parse_size(v).map_err(|_| {
                invalid("cache", "memory_size", v, "expected format like '256MB', '1GB', or '512KB'")
            })?;
        }
        if let Some(v) = section.get("claim_ttl") {
            config.cache.claim_ttl =
                parse_number(v, "cache", "claim_ttl", "must be a non-negative integer (seconds)")?;
        }
        if let Some(v) = section.get("failed_ttl") {
            config.cache.failed_ttl =
                parse_number(v, "cache", "failed_ttl", "must be a non-negative integer (seconds)")?;
        }
    }

    if config.loader.loader_type == LoaderType::Http
        && config.cache.claim_ttl != 0
        && config.cache.claim_ttl <= config.loader.timeout
    {
        return Err(invalid(
            "cache",
            "claim_ttl",
            &config.cache.claim_ttl.to_string(),
            "must be 0 or longer than loader.timeout",
        ));
    }

    // [workers] section
    if let Some(section) = ini.section(Some("workers")) {
        if let Some(v) = section.get("count") {
            config.workers.count = parse_positive(v, "workers", "count")?;
        }
        if let Some(v) = section.get("queue_capacity") {
            config.workers.queue_capacity = parse_positive(v, "workers", "queue_capacity")?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            config.logging.file = (!v.is_empty()).then(|| expand_tilde(v));
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Parses an integer that must be at least 1.
fn parse_positive<T>(value: &str, section: &str, key: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    let reason = "must be a positive integer";
    let n: T = parse_number(value, section, key, reason)?;
    if n < T::from(1) {
        return Err(invalid(section, key, value, reason));
    }
    Ok(n)
}

/// `~/` prefix becomes the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
