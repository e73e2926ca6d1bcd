//! Pending and failed placeholder thumbnails.
//!
//! Placeholders are ordinary, decodable records: an amber swatch while a
//! render is claimed but not yet stored, and a red swatch once it has
//! failed. Both are encoded once at startup.

use crate::codec::{RecordKind, ThumbRecord};
use chrono::Utc;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Edge length of the placeholder swatches.
pub const PLACEHOLDER_SIZE: u32 = 16;

const PENDING_COLOUR: Rgba<u8> = Rgba([255, 191, 0, 255]);
const FAILED_COLOUR: Rgba<u8> = Rgba([204, 0, 0, 255]);

/// Pre-rendered placeholder images.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pending: Vec<u8>,
    failed: Vec<u8>,
}

impl Placeholders {
    /// Encodes both swatches.
    ///
    /// # Errors
    ///
    /// Returns the PNG encoder's error; a solid swatch never fails in practice.
    pub fn new() -> Result<Self, image::ImageError> {
        Ok(Self {
            pending: solid_png(PENDING_COLOUR)?,
            failed: solid_png(FAILED_COLOUR)?,
        })
    }

    /// Record served while a render is in progress.
    pub fn pending(&self) -> ThumbRecord {
        self.record(RecordKind::Pending, &self.pending)
    }

    /// Record stored when a render failed.
    pub fn failed(&self) -> ThumbRecord {
        self.record(RecordKind::Failed, &self.failed)
    }

    fn record(&self, kind: RecordKind, data: &[u8]) -> ThumbRecord {
        ThumbRecord {
            created: Utc::now(),
            width: PLACEHOLDER_SIZE as i32,
            height: PLACEHOLDER_SIZE as i32,
            kind,
            mime: "image/png".to_string(),
            data: data.to_vec(),
        }
    }
}

fn solid_png(colour: Rgba<u8>) -> Result<Vec<u8>, image::ImageError> {
    let image = RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, colour);
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_valid_pngs() {
        let placeholders = Placeholders::new().unwrap();
        for record in [placeholders.pending(), placeholders.failed()] {
            let image = image::load_from_memory(&record.data).unwrap();
            assert_eq!(image.width(), PLACEHOLDER_SIZE);
            assert_eq!(record.mime, "image/png");
            assert!(record.is_placeholder());
        }
    }

    #[test]
    fn test_kinds_and_colours_differ() {
        let placeholders = Placeholders::new().unwrap();
        let pending = placeholders.pending();
        let failed = placeholders.failed();
        assert_eq!(pending.kind, RecordKind::Pending);
        assert_eq!(failed.kind, RecordKind::Failed);
        assert_ne!(pending.data, failed.data);

        let pixel = image::load_from_memory(&failed.data).unwrap().to_rgba8();
        assert_eq!(*pixel.get_pixel(0, 0), FAILED_COLOUR);
    }

    #[test]
    fn test_placeholders_survive_the_codec() {
        let record = Placeholders::new().unwrap().pending();
        let decoded = ThumbRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }
}
