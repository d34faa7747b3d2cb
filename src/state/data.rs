/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the codec, the transform session, and the database layer.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::codec::data_uri;
use crate::codec::format::OutputFormat;
use crate::codec::preview::PreviewUrl;
use crate::error::Result;
use crate::state::edit::TransformParameters;

/// A user-selected input file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Filename only (e.g., "holiday.jpg")
    pub name: String,
    pub bytes: Bytes,
    /// MIME type if the caller knows it
    pub mime_type: Option<String>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime_type: None,
        }
    }

    /// MIME type as given, else sniffed from the bytes
    pub fn mime_type(&self) -> String {
        if let Some(mime) = &self.mime_type {
            return mime.clone();
        }
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string())
    }
}

/// The image currently being edited
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file: SourceFile,
    /// Preview reference for the untouched original
    pub preview: PreviewUrl,
    /// Natural width/height, known after the first successful decode
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Output of one codec invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    pub preview: PreviewUrl,
    pub width: u32,
    /// Always `round(width * source_height / source_width)`
    pub height: u32,
    pub format: OutputFormat,
    pub source_width: u32,
    pub source_height: u32,
}

impl ProcessedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A saved image in the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImageRecord {
    /// Unique database ID
    pub id: i64,
    pub name: String,
    /// `data:` URI holding the encoded image
    pub payload: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl StoredImageRecord {
    /// Decode the payload back into image bytes
    pub fn decode_payload(&self) -> Result<Vec<u8>> {
        let (_, bytes) = data_uri::decode(&self.payload)?;
        Ok(bytes)
    }
}

/// The single settings row (id is always 1)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSettingRecord {
    pub id: i64,
    pub target_width: u32,
    pub quality: f32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSettingRecord {
    pub const ID: i64 = 1;

    /// A fresh record stamped as updated now
    pub fn new(target_width: u32, quality: f32) -> Self {
        Self {
            id: Self::ID,
            target_width,
            quality,
            created_at: None,
            updated_at: Some(Utc::now()),
        }
    }

    /// Transform parameters seeded from these settings
    pub fn parameters(&self, format: OutputFormat) -> TransformParameters {
        TransformParameters::new(self.target_width, self.quality, format)
    }
}
