use std::env;
use std::path::PathBuf;

use crate::codec::format::OutputFormat;
use crate::error::Result;
use crate::state::library::Library;

/// Runtime configuration, read from the environment (and `.env`)
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// SQLite database for the gallery and settings
    pub db_path: PathBuf,
    /// Where save-to-disk writes files
    pub download_dir: PathBuf,
    /// Output format used when none is requested
    pub default_format: OutputFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: Library::default_path(),
            download_dir: default_download_dir(),
            default_format: OutputFormat::Jpeg,
        }
    }
}

impl AppConfig {
    /// `SNAP_RESIZE_DB`, `SNAP_RESIZE_DOWNLOAD_DIR`, `SNAP_RESIZE_FORMAT`
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(path) = env::var("SNAP_RESIZE_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("SNAP_RESIZE_DOWNLOAD_DIR") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Ok(format) = env::var("SNAP_RESIZE_FORMAT") {
            config.default_format = format.parse()?;
        }

        Ok(config)
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
