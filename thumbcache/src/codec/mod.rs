//! Binary thumbnail record format.
//!
//! A rendered thumbnail is stored in the backend as an opaque byte string.
//! This module is the only place that interprets those bytes.
//!
//! # Layout
//!
//! All multi-byte integers are little-endian. Fixed-width fields come first
//! so the decoder knows every offset up to the first variable field without
//! scanning.
//!
//! ```text
//! offset  width  field
//! ------  -----  --------------------------------------------
//!      0      8  created, i64 nanoseconds since the Unix epoch
//!      8      4  width (i32)
//!     12      4  height (i32)
//!     16      1  kind (0 = rendered, 1 = pending, 2 = failed)
//!     17    var  varint len(mime), then mime bytes (UTF-8)
//!      .    var  varint len(data), then data bytes
//! ```

mod record;
pub mod varint;

pub use record::{RecordKind, ThumbRecord, FIXED_HEADER_LEN};

use thiserror::Error;

/// Errors raised while encoding or decoding a [`ThumbRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer ended before a field was complete
    #[error("Record truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Varint longer than ten bytes or wider than 64 bits
    #[error("Varint overflows 64 bits")]
    VarintOverflow,

    /// Length prefix does not fit in memory on this platform
    #[error("Field length {0} does not fit in usize")]
    LengthOverflow(u64),

    /// Kind byte is not a known record kind
    #[error("Unknown record kind {0}")]
    UnknownKind(u8),

    /// MIME field is not valid UTF-8
    #[error("MIME type is not valid UTF-8")]
    InvalidMime,

    /// Bytes left over after the last field
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// Creation time cannot be represented as i64 nanoseconds
    #[error("Timestamp outside the representable range")]
    TimestampOutOfRange,
}
