//! Human-readable size parsing (e.g., "20MB", "256MB").

use thiserror::Error;

/// A size value that is not a number with an optional K/M/G suffix.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '20MB', '512KB', or '1GB'")]
pub struct SizeParseError {
    input: String,
}

impl SizeParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

const SUFFIXES: [(&str, usize); 6] = [
    ("GB", 1 << 30),
    ("G", 1 << 30),
    ("MB", 1 << 20),
    ("M", 1 << 20),
    ("KB", 1 << 10),
    ("K", 1 << 10),
];

/// Parses `20MB`-style values into bytes.
///
/// Bare numbers are bytes; `K`/`KB`, `M`/`MB` and `G`/`GB` suffixes are
/// powers of 1024. Case-insensitive and whitespace tolerant.
///
/// # Examples
///
/// ```
/// use thumbcache::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1 KB").unwrap(), 1024);
/// assert_eq!(parse_size("20mb").unwrap(), 20 * 1024 * 1024);
/// ```
pub fn parse_size(s: &str) -> Result<usize, SizeParseError> {
    let s = s.trim();
    let upper = s.to_uppercase();

    let (digits, multiplier) = SUFFIXES
        .iter()
        .find(|(suffix, _)| upper.ends_with(suffix))
        .map(|(suffix, mult)| (s[..s.len() - suffix.len()].trim(), *mult))
        .unwrap_or((s, 1));

    let n: usize = digits.parse().map_err(|_| SizeParseError::new(s))?;
    n.checked_mul(multiplier).ok_or_else(|| SizeParseError::new(s))
}

/// Inverse of [`parse_size`] for values that divide evenly into a unit.
///
/// # Examples
///
/// ```
/// use thumbcache::config::format_size;
///
/// assert_eq!(format_size(1024), "1KB");
/// assert_eq!(format_size(20 * 1024 * 1024), "20MB");
/// assert_eq!(format_size(1000), "1000");
/// ```
pub fn format_size(bytes: usize) -> String {
    const GB: usize = 1 << 30;
    const MB: usize = 1 << 20;
    const KB: usize = 1 << 10;

    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{}", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number_is_bytes() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("0"), Ok(0));
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_size("64k").unwrap(), 64 * 1024);
        assert_eq!(parse_size("512Kb").unwrap(), 512 * 1024);
        assert_eq!(parse_size("20MB").unwrap(), 20 * 1024 * 1024);
        assert_eq!(parse_size("20m").unwrap(), 20 * 1024 * 1024);
        assert_eq!(parse_size("2GB").unwrap(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_surrounding_and_inner_spaces() {
        assert_eq!(parse_size("  256 MB ").unwrap(), 256 * 1024 * 1024);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_size(""), Err(SizeParseError::new("")));
        assert!(parse_size("MB").is_err());
        assert!(parse_size("lots").is_err());
        assert!(parse_size("2TB").is_err());
        assert!(parse_size("-1MB").is_err());
        assert!(parse_size("1.5MB").is_err());
    }

    #[test]
    fn test_format_picks_largest_exact_unit() {
        assert_eq!(format_size(3 << 30), "3GB");
        assert_eq!(format_size(256 * 1024 * 1024), "256MB");
        assert_eq!(format_size(1536), "1536");
    }

    #[test]
    fn test_format_then_parse() {
        for s in ["1KB", "20MB", "256MB", "2GB"] {
            assert_eq!(format_size(parse_size(s).unwrap()), s);
        }
    }
}
