//! Thumbnail record type and its wire encoding.

use super::{varint, CodecError};
use chrono::{DateTime, Utc};

/// Size of the fixed-width prefix: created (8) + width (4) + height (4) + kind (1).
pub const FIXED_HEADER_LEN: usize = 17;

const WIDTH_OFFSET: usize = 8;
const HEIGHT_OFFSET: usize = 12;
const KIND_OFFSET: usize = 16;

/// What a stored record stands for.
///
/// Pending and failed placeholders are complete, servable images; the kind
/// only tells the caller how long the answer is good for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    /// A finished thumbnail
    Rendered = 0,
    /// A render is claimed but not yet stored
    Pending = 1,
    /// The render failed; the record is the error image
    Failed = 2,
}

impl RecordKind {
    /// Returns a string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Rendered => "rendered",
            RecordKind::Pending => "pending",
            RecordKind::Failed => "failed",
        }
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RecordKind::Rendered),
            1 => Ok(RecordKind::Pending),
            2 => Ok(RecordKind::Failed),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

/// A rendered thumbnail as stored in the cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbRecord {
    /// When the render completed
    pub created: DateTime<Utc>,
    /// Pixel width after resizing
    pub width: i32,
    /// Pixel height after resizing
    pub height: i32,
    /// Rendered thumbnail or placeholder
    pub kind: RecordKind,
    /// MIME type of `data`
    pub mime: String,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

impl ThumbRecord {
    /// Creates a rendered record stamped with the current time.
    pub fn rendered(width: i32, height: i32, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            created: Utc::now(),
            width,
            height,
            kind: RecordKind::Rendered,
            mime: mime.into(),
            data,
        }
    }

    /// Returns true for pending and failed placeholders.
    pub fn is_placeholder(&self) -> bool {
        self.kind != RecordKind::Rendered
    }

    /// Exact number of bytes [`encode`](Self::encode) produces.
    ///
    /// Computed arithmetically; nothing is allocated.
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LEN
            + varint::encoded_len(self.mime.len() as u64)
            + self.mime.len()
            + varint::encoded_len(self.data.len() as u64)
            + self.data.len()
    }

    /// Serializes the record into a buffer sized exactly by [`encoded_len`](Self::encoded_len).
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let nanos = self
            .created
            .timestamp_nanos_opt()
            .ok_or(CodecError::TimestampOutOfRange)?;

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&nanos.to_le_bytes());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.push(self.kind as u8);

        varint::put(&mut buf, self.mime.len() as u64);
        buf.extend_from_slice(self.mime.as_bytes());
        varint::put(&mut buf, self.data.len() as u64);
        buf.extend_from_slice(&self.data);

        debug_assert_eq!(buf.len(), self.encoded_len());
        Ok(buf)
    }

    /// Parses a record, rejecting truncated, oversized or malformed input.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < FIXED_HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: FIXED_HEADER_LEN,
                available: buf.len(),
            });
        }

        let nanos = i64::from_le_bytes(read_array(buf, 0));
        let width = i32::from_le_bytes(read_array(buf, WIDTH_OFFSET));
        let height = i32::from_le_bytes(read_array(buf, HEIGHT_OFFSET));
        let kind = RecordKind::try_from(buf[KIND_OFFSET])?;

        let mut pos = FIXED_HEADER_LEN;
        let mime = read_field(buf, &mut pos)?;
        let mime = std::str::from_utf8(mime)
            .map_err(|_| CodecError::InvalidMime)?
            .to_string();
        let data = read_field(buf, &mut pos)?.to_vec();

        if pos != buf.len() {
            return Err(CodecError::TrailingBytes(buf.len() - pos));
        }

        Ok(Self {
            created: DateTime::<Utc>::from_timestamp_nanos(nanos),
            width,
            height,
            kind,
            mime,
            data,
        })
    }
}

/// Copies a fixed-size array out of a buffer already checked to be long enough.
fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// Reads a varint length prefix and the slice it describes, advancing `pos`.
fn read_field<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], CodecError> {
    let (len, consumed) = varint::get(&buf[*pos..])?;
    let len = usize::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
    let start = *pos + consumed;
    let end = start.checked_add(len).ok_or(CodecError::LengthOverflow(len as u64))?;

    if end > buf.len() {
        return Err(CodecError::Truncated {
            needed: end,
            available: buf.len(),
        });
    }

    *pos = end;
    Ok(&buf[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> ThumbRecord {
        ThumbRecord {
            created: Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap()
                + chrono::Duration::nanoseconds(123_456_789),
            width: 100,
            height: 50,
            kind: RecordKind::Rendered,
            mime: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
        }
    }

    #[test]
    fn test_round_trip() {
        let record = sample_record();
        let bytes = record.encode().unwrap();
        assert_eq!(ThumbRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let mut record = sample_record();
        record.data = vec![7u8; 200_000];
        let bytes = record.encode().unwrap();
        assert_eq!(record.encoded_len(), bytes.len());
    }

    #[test]
    fn test_fixed_layout() {
        let record = sample_record();
        let bytes = record.encode().unwrap();
        let nanos = record.created.timestamp_nanos_opt().unwrap();

        assert_eq!(&bytes[0..8], &nanos.to_le_bytes());
        assert_eq!(&bytes[8..12], &100i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &50i32.to_le_bytes());
        assert_eq!(bytes[16], 0);
        assert_eq!(bytes[17], 9); // len("image/png")
        assert_eq!(&bytes[18..27], b"image/png");
        assert_eq!(bytes[27], 7);
        assert_eq!(&bytes[28..], &record.data[..]);
    }

    #[test]
    fn test_placeholder_kinds_round_trip() {
        for kind in [RecordKind::Pending, RecordKind::Failed] {
            let mut record = sample_record();
            record.kind = kind;
            let decoded = ThumbRecord::decode(&record.encode().unwrap()).unwrap();
            assert_eq!(decoded.kind, kind);
            assert!(decoded.is_placeholder());
        }
    }

    #[test]
    fn test_empty_fields() {
        let mut record = sample_record();
        record.mime.clear();
        record.data.clear();
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), FIXED_HEADER_LEN + 2);
        assert_eq!(ThumbRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_pre_epoch_timestamp() {
        let mut record = sample_record();
        record.created = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        let decoded = ThumbRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded.created, record.created);
    }

    #[test]
    fn test_every_truncation_fails_cleanly() {
        let bytes = sample_record().encode().unwrap();
        for len in 0..bytes.len() {
            let result = ThumbRecord::decode(&bytes[..len]);
            assert!(result.is_err(), "prefix of length {} decoded", len);
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_record().encode().unwrap();
        bytes.push(0);
        assert_eq!(
            ThumbRecord::decode(&bytes),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut bytes = sample_record().encode().unwrap();
        bytes[KIND_OFFSET] = 9;
        assert_eq!(ThumbRecord::decode(&bytes), Err(CodecError::UnknownKind(9)));
    }

    #[test]
    fn test_huge_length_prefix_is_truncated_not_panic() {
        let mut bytes = sample_record().encode().unwrap();
        bytes.truncate(FIXED_HEADER_LEN);
        varint::put(&mut bytes, u64::from(u32::MAX));
        let result = ThumbRecord::decode(&bytes);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_utf8_mime() {
        let mut bytes = sample_record().encode().unwrap();
        bytes[18] = 0xFF;
        assert_eq!(ThumbRecord::decode(&bytes), Err(CodecError::InvalidMime));
    }

    #[test]
    fn test_single_sentinel_byte_is_not_a_record() {
        assert!(ThumbRecord::decode(&[0]).is_err());
    }
}
