/// Transient preview references
///
/// A preview reference lets the display layer render in-memory bytes
/// without touching disk. Every reference handed out by an allocator must
/// be released again, or the bytes it pins stay alive for the life of
/// the process.
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const PREVIEW_SCHEME: &str = "blob:snap-resize/";

/// Handle to bytes held by a [`PreviewAllocator`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewUrl(String);

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn key(&self) -> Option<u64> {
        self.0.strip_prefix(PREVIEW_SCHEME)?.parse().ok()
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocator/releaser pair for preview references
pub trait PreviewAllocator: Send + Sync {
    fn allocate(&self, bytes: Bytes, mime_type: &str) -> PreviewUrl;

    /// Releasing an unknown or already-released reference is a no-op
    fn release(&self, url: &PreviewUrl);
}

struct PreviewEntry {
    bytes: Bytes,
    mime_type: String,
}

/// In-memory preview registry
#[derive(Default)]
pub struct PreviewRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, PreviewEntry>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the bytes and MIME type behind a live reference
    pub fn resolve(&self, url: &PreviewUrl) -> Option<(Bytes, String)> {
        let key = url.key()?;
        self.entries
            .lock()
            .get(&key)
            .map(|entry| (entry.bytes.clone(), entry.mime_type.clone()))
    }

    /// Number of references that have not been released yet
    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl PreviewAllocator for PreviewRegistry {
    fn allocate(&self, bytes: Bytes, mime_type: &str) -> PreviewUrl {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.lock().insert(
            id,
            PreviewEntry {
                bytes,
                mime_type: mime_type.to_string(),
            },
        );
        PreviewUrl(format!("{}{}", PREVIEW_SCHEME, id))
    }

    fn release(&self, url: &PreviewUrl) {
        if let Some(key) = url.key() {
            if self.entries.lock().remove(&key).is_some() {
                tracing::trace!("Released preview {}", url);
            }
        }
    }
}

impl fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}
