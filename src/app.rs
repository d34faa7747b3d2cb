//! Application facade.
//!
//! [`SnapResize`] wires the codec engine, the transform session and the
//! gallery library together and adds the compound actions a front end
//! needs: open a file from disk, save the current result to the gallery,
//! and write results out to the download directory.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::preview::PreviewRegistry;
use crate::codec::ImageEngine;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::export;
use crate::state::data::{SourceFile, StoredImageRecord};
use crate::state::edit::TransformParameters;
use crate::state::library::Library;
use crate::state::session::{Outcome, TransformSession};

pub struct SnapResize {
    config: AppConfig,
    library: Arc<Library>,
    previews: Arc<PreviewRegistry>,
    session: TransformSession,
}

impl SnapResize {
    /// Build the app with built-in default parameters. The database is
    /// not touched until the first store operation.
    pub fn new(config: AppConfig) -> Self {
        let library = Arc::new(Library::new(config.db_path.clone()));
        Self::with_library(config, library)
    }

    /// Build the app around an existing library handle
    pub fn with_library(config: AppConfig, library: Arc<Library>) -> Self {
        let previews = Arc::new(PreviewRegistry::new());
        let engine = Arc::new(ImageEngine::new(previews.clone()));
        let parameters = TransformParameters {
            format: config.default_format,
            ..TransformParameters::default()
        };
        let session = TransformSession::new(engine, previews.clone(), parameters);

        Self {
            config,
            library,
            previews,
            session,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn session(&self) -> &TransformSession {
        &self.session
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Seed the session parameters from the stored settings. The output
    /// format is kept, since settings do not carry one.
    pub async fn load_settings(&self) -> Result<TransformParameters> {
        let current = self.session.parameters();
        let parameters = match self.library.get_settings().await? {
            Some(settings) => settings.parameters(current.format),
            None => current,
        };
        self.session.set_parameters(parameters).await?;
        Ok(parameters)
    }

    /// Read a file from disk and make it the session's source
    pub async fn open_file(&self, path: &Path) -> Result<Outcome> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        self.session
            .select_file(SourceFile::new(name, Bytes::from(bytes)))
            .await
    }

    /// Save the current processed result to the gallery.
    ///
    /// The processed preview stays alive; it is released on the next
    /// reset or re-process. A failed save leaves the session untouched,
    /// so the caller can simply retry.
    pub async fn save_to_gallery(&self, name: Option<&str>) -> Result<i64> {
        let processed = self
            .session
            .processed()
            .ok_or(Error::NoProcessedImage)?;

        let default_name = export::processed_file_name(processed.format);
        let name = name.unwrap_or(&default_name);

        self.library
            .save_image(&processed.bytes, name, processed.mime_type())
            .await
            .map_err(|e| {
                tracing::warn!("⚠️  Save to gallery failed: {}", e);
                e
            })
    }

    /// Write the current processed result to `dir` (or the download dir)
    pub async fn download_processed(&self, dir: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(processed) = self.session.processed() else {
            return Ok(None);
        };
        let dir = dir.unwrap_or(self.config.download_dir.as_path());
        let path = export::save_to_disk(
            dir,
            &export::processed_file_name(processed.format),
            &processed.bytes,
        )
        .await?;
        Ok(Some(path))
    }

    /// Write the untouched original to `dir` under its own name
    pub async fn download_original(&self, dir: Option<&Path>) -> Result<Option<PathBuf>> {
        let Some(source) = self.session.source() else {
            return Ok(None);
        };
        let dir = dir.unwrap_or(self.config.download_dir.as_path());
        let path = export::save_to_disk(dir, &source.file.name, &source.file.bytes).await?;
        Ok(Some(path))
    }

    /// Decode a gallery image and write it to `dir` under its saved name
    pub async fn download_saved(&self, id: i64, dir: Option<&Path>) -> Result<PathBuf> {
        let record: StoredImageRecord = self
            .library
            .get_image(id)
            .await?
            .ok_or(Error::NotFound(id))?;

        let bytes = record.decode_payload()?;
        let dir = dir.unwrap_or(self.config.download_dir.as_path());
        export::save_to_disk(dir, &record.name, &bytes).await
    }
}

impl std::fmt::Debug for SnapResize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapResize")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish()
    }
}
