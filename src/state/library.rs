use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use super::data::{StoredImageRecord, StoredSettingRecord};
use super::edit::{DEFAULT_QUALITY, DEFAULT_TARGET_WIDTH};
use crate::codec::data_uri;
use crate::error::{Error, Result};

/// Schema migrations, applied in order. Entry N brings the database to
/// `user_version` N + 1. Migrations only ever add tables and indexes.
const MIGRATIONS: &[&str] = &[
    // 1: saved images, with a timestamp index for the "latest" query
    "CREATE TABLE IF NOT EXISTS images (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        payload     TEXT NOT NULL,
        mime_type   TEXT NOT NULL,
        created_at  INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_images_created_at
        ON images(created_at DESC);",
    // 2: singleton settings row
    "CREATE TABLE IF NOT EXISTS settings (
        id            INTEGER PRIMARY KEY CHECK (id = 1),
        target_width  INTEGER NOT NULL,
        quality       REAL NOT NULL,
        created_at    INTEGER,
        updated_at    INTEGER
    );",
    // 3: index matching the "latest" ordering, id breaks timestamp ties
    "CREATE INDEX IF NOT EXISTS idx_images_created_at_id
        ON images(created_at DESC, id DESC);",
];

/// Newest image first. Served by `idx_images_created_at_id`.
const LATEST_IMAGE_SQL: &str = "SELECT id, name, payload, mime_type, created_at FROM images
     ORDER BY created_at DESC, id DESC LIMIT 1";

/// The Library manages the SQLite gallery database.
/// It stores saved images as data URIs and the default resize settings.
///
/// The connection is opened lazily by the first operation and shared
/// by every caller after that. Operations queue on a fair mutex, so they
/// are served in the order they were submitted, and each one runs on the
/// blocking pool.
pub struct Library {
    db_path: PathBuf,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl Library {
    /// Create a Library for the database at `db_path`. Nothing is opened yet.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            conn: OnceCell::new(),
        }
    }

    /// Get the path where the database should be stored
    ///
    /// - Linux: ~/.local/share/snap-resize/snap_resize.db
    /// - macOS: ~/Library/Application Support/snap-resize/snap_resize.db
    /// - Windows: %APPDATA%\snap-resize\snap_resize.db
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push("snap-resize");
        path.push("snap_resize.db");
        path
    }

    /// Store an image, stamped with the current time. Returns the new ID.
    pub async fn save_image(&self, bytes: &[u8], name: &str, mime_type: &str) -> Result<i64> {
        self.save_image_at(bytes, name, mime_type, Utc::now()).await
    }

    /// Store an image with an explicit creation time
    pub async fn save_image_at(
        &self,
        bytes: &[u8],
        name: &str,
        mime_type: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let payload = data_uri::encode(mime_type, bytes);
        let name = name.to_string();
        let mime_type = mime_type.to_string();

        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO images (name, payload, mime_type, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![name, payload, mime_type, created_at.timestamp_millis()],
                )
                .map_err(Error::write)?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::info!("💾 Saved image {}", id);
        Ok(id)
    }

    /// Get all saved images, in no particular order
    pub async fn list_images(&self) -> Result<Vec<StoredImageRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, payload, mime_type, created_at FROM images")
                .map_err(Error::read)?;

            let image_iter = stmt.query_map([], image_from_row).map_err(Error::read)?;

            let mut images = Vec::new();
            for image in image_iter {
                images.push(image.map_err(Error::read)?);
            }

            Ok(images)
        })
        .await
    }

    /// Get the most recently created image, if any
    pub async fn latest_image(&self) -> Result<Option<StoredImageRecord>> {
        self.with_conn(|conn| {
            conn.query_row(LATEST_IMAGE_SQL, [], image_from_row)
            .optional()
            .map_err(Error::read)
        })
        .await
    }

    /// Get a single image by ID
    pub async fn get_image(&self, id: i64) -> Result<Option<StoredImageRecord>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, payload, mime_type, created_at FROM images WHERE id = ?1",
                [id],
                image_from_row,
            )
            .optional()
            .map_err(Error::read)
        })
        .await
    }

    /// Get a count of images in the library
    pub async fn image_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
                .map_err(Error::read)
        })
        .await
    }

    /// Delete an image. Deleting an unknown ID is not an error.
    pub async fn delete_image(&self, id: i64) -> Result<()> {
        let removed = self
            .with_conn(move |conn| {
                conn.execute("DELETE FROM images WHERE id = ?1", [id])
                    .map_err(Error::write)
            })
            .await?;

        if removed == 0 {
            tracing::debug!("Delete of image {} matched nothing", id);
        } else {
            tracing::info!("🗑️  Deleted image {}", id);
        }
        Ok(())
    }

    /// Read the settings row
    pub async fn get_settings(&self) -> Result<Option<StoredSettingRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, target_width, quality, created_at, updated_at FROM settings WHERE id = ?1",
                [StoredSettingRecord::ID],
                settings_from_row,
            )
            .optional()
            .map_err(Error::read)
        })
        .await
    }

    /// Replace the settings row. The ID is always forced to 1, and a record
    /// without `created_at` keeps the stored creation time.
    pub async fn save_settings(&self, settings: StoredSettingRecord) -> Result<()> {
        let (target_width, quality) = (settings.target_width, settings.quality);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO settings (id, target_width, quality, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    target_width = excluded.target_width,
                    quality = excluded.quality,
                    created_at = COALESCE(excluded.created_at, settings.created_at),
                    updated_at = excluded.updated_at",
                params![
                    StoredSettingRecord::ID,
                    settings.target_width,
                    settings.quality as f64,
                    settings.created_at.map(|t| t.timestamp_millis()),
                    settings.updated_at.map(|t| t.timestamp_millis()),
                ],
            )
            .map_err(Error::write)?;
            Ok(())
        })
        .await?;

        tracing::info!(
            "⚙️  Saved settings: width={}, quality={}",
            target_width,
            quality
        );
        Ok(())
    }

    /// Run `f` against the shared connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.connection().await?;
        let guard = conn.lock_owned().await;

        tokio::task::spawn_blocking(move || {
            let mut guard = guard;
            f(&mut *guard)
        })
        .await
        .map_err(|e| Error::StoreUnavailable(format!("Task join error: {}", e)))?
    }

    /// Open the database on first use. A failed open is not cached.
    async fn connection(&self) -> Result<Arc<Mutex<Connection>>> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let db_path = self.db_path.clone();
                let conn = tokio::task::spawn_blocking(move || open_database(&db_path))
                    .await
                    .map_err(|e| Error::StoreUnavailable(format!("Task join error: {}", e)))??;
                Ok::<_, Error>(Arc::new(Mutex::new(conn)))
            })
            .await?;
        Ok(conn.clone())
    }
}

/// Open or create the database and bring its schema up to date
fn open_database(db_path: &Path) -> Result<Connection> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::StoreUnavailable(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let mut conn =
        Connection::open(db_path).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
    init_schema(&mut conn).map_err(|e| Error::StoreUnavailable(e.to_string()))?;

    tracing::info!("📁 Database initialized at: {}", db_path.display());
    Ok(conn)
}

/// Apply any migrations newer than the stored `user_version`, then seed
/// the settings row if it has never been written.
fn init_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let current = version.max(0) as usize;

    let tx = conn.transaction()?;
    for (index, migration) in MIGRATIONS.iter().enumerate().skip(current) {
        tx.execute_batch(migration)?;
        tracing::info!("Applied schema migration {}", index + 1);
    }
    if current < MIGRATIONS.len() {
        tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)?;
    }

    let now = Utc::now().timestamp_millis();
    tx.execute(
        "INSERT OR IGNORE INTO settings (id, target_width, quality, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![
            StoredSettingRecord::ID,
            DEFAULT_TARGET_WIDTH,
            DEFAULT_QUALITY as f64,
            now
        ],
    )?;
    tx.commit()?;

    Ok(())
}

fn timestamp(index: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(index, millis))
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<StoredImageRecord> {
    Ok(StoredImageRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        payload: row.get(2)?,
        mime_type: row.get(3)?,
        created_at: timestamp(4, row.get(4)?)?,
    })
}

fn settings_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSettingRecord> {
    let created_at: Option<i64> = row.get(3)?;
    let updated_at: Option<i64> = row.get(4)?;
    let quality: f64 = row.get(2)?;

    Ok(StoredSettingRecord {
        id: row.get(0)?,
        target_width: row.get(1)?,
        quality: quality as f32,
        created_at: created_at.map(|t| timestamp(3, t)).transpose()?,
        updated_at: updated_at.map(|t| timestamp(4, t)).transpose()?,
    })
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .field("open", &self.conn.initialized())
            .finish()
    }
}
