/// Save-to-disk helpers
///
/// Writes processed results, originals and saved gallery images into a
/// download directory. Nothing here touches the gallery database.

use std::path::{Path, PathBuf};

use crate::codec::format::OutputFormat;
use crate::error::Result;

/// Filename for a processed result, e.g. `processed-image.webp`
pub fn processed_file_name(format: OutputFormat) -> String {
    format!("processed-image.{}", format.extension())
}

/// Strip any directory components so a name cannot escape the target dir
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        "image".to_string()
    } else {
        base.to_string()
    }
}

/// Write `bytes` to `dir/file_name`, creating `dir` if needed
pub async fn save_to_disk(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(sanitize_file_name(file_name));
    tokio::fs::write(&path, bytes).await?;

    tracing::info!("⬇️  Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
