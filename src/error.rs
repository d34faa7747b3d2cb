//! Error types for the snap-resize library.
//!
//! Codec failures are caught by the transform session and turned into
//! session state. Store failures go back to the immediate caller.

use thiserror::Error;

/// Errors that can occur while transforming or persisting images.
#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes are not a valid or supported raster image.
    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    /// Resample or re-encode step failed.
    #[error("Failed to encode image: {0}")]
    EncodeFailure(String),

    /// Target width or quality is outside the accepted range.
    #[error("Invalid transform parameters: {0}")]
    InvalidParameters(String),

    /// The underlying store could not be opened or migrated.
    #[error("Image store unavailable: {0}")]
    StoreUnavailable(String),

    /// An individual save, delete or upsert failed.
    #[error("Image store write failed: {0}")]
    StoreWriteFailure(String),

    /// A query against the store failed.
    #[error("Image store read failed: {0}")]
    StoreReadFailure(String),

    /// The session holds no processed result to act on.
    #[error("No processed image available")]
    NoProcessedImage,

    /// No record with the given identity.
    #[error("No saved image with id {0}")]
    NotFound(i64),

    /// A stored payload is not a valid data URI.
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailure(msg.into())
    }

    pub fn write(err: impl std::fmt::Display) -> Self {
        Self::StoreWriteFailure(err.to_string())
    }

    pub fn read(err: impl std::fmt::Display) -> Self {
        Self::StoreReadFailure(err.to_string())
    }
}

/// A convenient alias for Result with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
