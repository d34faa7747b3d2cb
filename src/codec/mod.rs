/// Image codec module
///
/// This module handles:
/// - Decoding a source image and resizing it to a target width
/// - Sharpening and re-encoding to JPEG, PNG or WebP
/// - Preview references for in-memory results
/// - The data URI encoding used by the gallery

pub mod data_uri;
pub mod format;
pub mod preview;
pub mod processor;
pub mod sharpen;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::state::data::ProcessedImage;
use crate::state::edit::TransformParameters;
use preview::PreviewAllocator;

/// Turns source bytes into a processed image
///
/// Implementations must not mutate the source and must not return a
/// partial result on failure. The preview reference inside a returned
/// [`ProcessedImage`] belongs to the caller.
#[async_trait]
pub trait Codec: Send + Sync {
    async fn transform(&self, source: Bytes, params: TransformParameters) -> Result<ProcessedImage>;
}

/// The codec engine: decode, resize, sharpen and encode off the async runtime
pub struct ImageEngine {
    previews: Arc<dyn PreviewAllocator>,
}

impl ImageEngine {
    pub fn new(previews: Arc<dyn PreviewAllocator>) -> Self {
        Self { previews }
    }
}

#[async_trait]
impl Codec for ImageEngine {
    async fn transform(&self, source: Bytes, params: TransformParameters) -> Result<ProcessedImage> {
        params.validate()?;

        // Spawn blocking because decoding and resampling are CPU-intensive
        let encoded = tokio::task::spawn_blocking(move || processor::process_image(&source, &params))
            .await
            .map_err(|e| Error::encode(format!("Task join error: {}", e)))??;

        let bytes = Bytes::from(encoded.bytes);
        let preview = self.previews.allocate(bytes.clone(), params.format.mime_type());

        Ok(ProcessedImage {
            bytes,
            preview,
            width: encoded.width,
            height: encoded.height,
            format: params.format,
            source_width: encoded.source_width,
            source_height: encoded.source_height,
        })
    }
}

impl std::fmt::Debug for ImageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageEngine").finish_non_exhaustive()
    }
}
