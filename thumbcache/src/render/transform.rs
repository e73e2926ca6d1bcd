//! CPU-bound half of a render: decode, fit-in resize and encode.
//!
//! Everything here is synchronous and runs on the blocking pool.

use super::{RenderError, RenderLimits};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

/// Output of [`render_bytes`], with the source facts kept for logging.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub source_format: ImageFormat,
    pub source_width: u32,
    pub source_height: u32,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
    pub data: Vec<u8>,
}

/// Computes the fit-in size of a `src_w`x`src_h` image inside a
/// `box_w`x`box_h` box.
///
/// The aspect ratio is kept, the image is never upscaled and neither side
/// drops below one pixel.
pub fn fit_within(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let (src_w, src_h) = (src_w.max(1), src_h.max(1));
    let (box_w, box_h) = (box_w.max(1), box_h.max(1));

    if src_w <= box_w && src_h <= box_h {
        return (src_w, src_h);
    }

    let (sw, sh, bw, bh) = (
        u64::from(src_w),
        u64::from(src_h),
        u64::from(box_w),
        u64::from(box_h),
    );

    // Width is the binding side when the source is relatively wider than the box.
    if sw * bh > sh * bw {
        (box_w, ((sh * bw) / sw).max(1) as u32)
    } else {
        (((sw * bh) / sh).max(1) as u32, box_h)
    }
}

/// MIME type of the encoding chosen for a source format.
pub fn output_mime(source: ImageFormat) -> &'static str {
    match source {
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        _ => "image/jpeg",
    }
}

/// Decodes `bytes`, fits it into `box_w`x`box_h` and re-encodes it.
///
/// The header is inspected first so oversized inputs are rejected before
/// any pixel data is decoded.
pub fn render_bytes(
    bytes: &[u8],
    box_w: u32,
    box_h: u32,
    limits: &RenderLimits,
) -> Result<RenderedImage, RenderError> {
    let format = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RenderError::Decode(e.to_string()))?
        .format()
        .ok_or_else(|| RenderError::Decode("unrecognised image format".to_string()))?;

    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif) {
        return Err(RenderError::Decode(format!(
            "unsupported image format {:?}",
            format
        )));
    }

    let (source_width, source_height) = reader(bytes, format)
        .into_dimensions()
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    let max_in = limits.max_input_dimension;
    if source_width > max_in || source_height > max_in {
        return Err(RenderError::InputTooLarge {
            width: source_width,
            height: source_height,
            limit: max_in,
        });
    }

    let mut reader = reader(bytes, format);
    let mut decode_limits = Limits::default();
    decode_limits.max_image_width = Some(max_in);
    decode_limits.max_image_height = Some(max_in);
    reader.limits(decode_limits);

    let image = reader
        .decode()
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    let (width, height) = fit_within(image.width(), image.height(), box_w, box_h);
    let resized = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Nearest)
    };

    let data = encode(&resized, format, limits.jpeg_quality)?;

    Ok(RenderedImage {
        source_format: format,
        source_width,
        source_height,
        width: resized.width(),
        height: resized.height(),
        mime: output_mime(format),
        data,
    })
}

fn reader(bytes: &[u8], format: ImageFormat) -> ImageReader<Cursor<&[u8]>> {
    ImageReader::with_format(Cursor::new(bytes), format)
}

/// Encodes into the format family of the source.
fn encode(image: &DynamicImage, source: ImageFormat, quality: u8) -> Result<Vec<u8>, RenderError> {
    let encode_err = |e: image::ImageError| RenderError::Encode(e.to_string());

    match source {
        ImageFormat::Png => {
            let mut out = Cursor::new(Vec::new());
            image.write_to(&mut out, ImageFormat::Png).map_err(encode_err)?;
            Ok(out.into_inner())
        }
        ImageFormat::Gif => {
            let mut out = Vec::new();
            {
                // Quantises to a 256-colour palette; the trailer is written on drop.
                let mut encoder = GifEncoder::new(&mut out);
                encoder
                    .encode_frame(Frame::new(image.to_rgba8()))
                    .map_err(encode_err)?;
            }
            Ok(out)
        }
        _ => {
            let mut out = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
            encoder.encode_image(&image.to_rgb8()).map_err(encode_err)?;
            Ok(out)
        }
    }
}
