//! snap-resize: a local-first image resizer and converter.
//!
//! An image goes through a short pipeline: decode, resize to a target
//! width (height follows the aspect ratio), sharpen, re-encode at a chosen
//! format and quality. Results can be kept in a small SQLite gallery as
//! data URIs, next to a singleton record of default settings.
//!
//! # Module Structure
//!
//! - [`codec`]: the codec engine, preview references, data URIs
//! - [`state`]: transform parameters, the transform session, the gallery library
//! - [`ui`]: the before/after comparison slider
//! - [`export`]: save-to-disk helpers
//! - [`app`]: facade tying the pieces together
//! - [`config`]: environment configuration
//! - [`error`]: error kinds and the `Result` alias

pub mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod state;
pub mod ui;

pub use app::SnapResize;
pub use codec::format::OutputFormat;
pub use codec::{Codec, ImageEngine};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use state::data::{ProcessedImage, SourceFile, StoredImageRecord, StoredSettingRecord};
pub use state::edit::TransformParameters;
pub use state::library::Library;
pub use state::session::{Outcome, SessionStatus, TransformSession};
