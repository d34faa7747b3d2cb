/// Blocking resize + re-encode pipeline
///
/// This module does the CPU-bound part of a transform in one pass:
/// - Decode the source bytes
/// - Resize to the target width, height derived from the aspect ratio
/// - Sharpen the resampled pixels
/// - Encode to the requested format and quality

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;

use super::format::OutputFormat;
use super::sharpen::UnsharpMask;
use crate::error::{Error, Result};
use crate::state::edit::TransformParameters;

/// Output of a single blocking transform
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

/// Height that preserves the source aspect ratio at `target_width`
///
/// `round(target_width * natural_height / natural_width)`, raised to 1
/// so a very wide source never produces an empty surface.
pub fn target_height(target_width: u32, natural_width: u32, natural_height: u32) -> u32 {
    if natural_width == 0 {
        return 1;
    }
    let height = (target_width as f64 * natural_height as f64 / natural_width as f64).round();
    (height as u32).max(1)
}

/// Map quality (0, 1] onto the 1-100 scale encoders use
pub fn encoder_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Run the full transform on the calling thread
pub fn process_image(source: &[u8], params: &TransformParameters) -> Result<Encoded> {
    params.validate()?;

    // Step 1: Decode
    let img = image::load_from_memory(source).map_err(|e| Error::decode(e.to_string()))?;
    let (source_width, source_height) = (img.width(), img.height());
    if source_width == 0 || source_height == 0 {
        return Err(Error::decode("image has no pixels"));
    }

    // Step 2: Resize, width-constrained
    let width = params.target_width;
    let height = target_height(width, source_width, source_height);
    let mut surface = img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8();

    // Step 3: Sharpen
    UnsharpMask::default().apply(&mut surface);

    // Step 4: Encode
    let bytes = encode(DynamicImage::ImageRgba8(surface), params.format, params.quality)?;

    tracing::debug!(
        "Encoded {}x{} -> {}x{} {} ({} bytes)",
        source_width,
        source_height,
        width,
        height,
        params.format,
        bytes.len()
    );

    Ok(Encoded {
        bytes,
        width,
        height,
        source_width,
        source_height,
    })
}

/// Encode a surface to `format`, handing `quality` straight to the encoder
fn encode(surface: DynamicImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = surface.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut buffer, encoder_quality(quality));
            rgb.write_with_encoder(encoder)
                .map_err(|e| Error::encode(format!("JPEG: {}", e)))?;
        }
        OutputFormat::Png => {
            // Lossless, quality does not apply
            surface
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| Error::encode(format!("PNG: {}", e)))?;
        }
        OutputFormat::Webp => {
            let rgba = surface.to_rgba8();
            let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
            let memory = encoder
                .encode_simple(false, encoder_quality(quality) as f32)
                .map_err(|e| Error::encode(format!("WebP: {:?}", e)))?;
            buffer.extend_from_slice(&memory);
        }
    }

    if buffer.is_empty() {
        return Err(Error::encode(format!("{} encoder produced no data", format)));
    }

    Ok(buffer)
}
