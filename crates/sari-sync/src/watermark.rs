//! # Sync Watermark
//!
//! The watermark is the single timestamp this device has durably confirmed
//! as "everything up to here has been pushed". It only ever advances after
//! a FULLY successful push; a partial push leaves it untouched so the next
//! attempt re-sends everything since the last good one.
//!
//! A missing watermark means "never synced" and reads as 0, which makes
//! the first push a full upload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use sari_core::TimestampMs;

/// Key under which the watermark is stored, kept stable across releases
/// so upgrades don't trigger a spurious full re-push.
pub const WATERMARK_KEY: &str = "sync:lastSyncedAt";

/// Durable storage for the push watermark.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Loads the watermark; `None` means this device has never completed
    /// a push.
    async fn load(&self) -> SyncResult<Option<TimestampMs>>;

    /// Durably saves the watermark. Must not return before the value would
    /// survive a process restart.
    async fn save(&self, watermark: TimestampMs) -> SyncResult<()>;
}

// =============================================================================
// File-Backed Store
// =============================================================================

/// On-disk JSON document holding the watermark.
#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    #[serde(rename = "sync:lastSyncedAt")]
    last_synced_at: TimestampMs,
}

/// JSON-file watermark storage, the production implementation.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous watermark intact.
#[derive(Debug)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    /// Creates a store backed by the given file path. The file is created
    /// on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileWatermarkStore { path: path.into() }
    }
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn load(&self) -> SyncResult<Option<TimestampMs>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::WatermarkLoadFailed(e.to_string())),
        };

        let file: WatermarkFile = serde_json::from_str(&contents)
            .map_err(|e| SyncError::WatermarkLoadFailed(e.to_string()))?;

        Ok(Some(file.last_synced_at))
    }

    async fn save(&self, watermark: TimestampMs) -> SyncResult<()> {
        let contents = serde_json::to_string_pretty(&WatermarkFile {
            last_synced_at: watermark,
        })
        .map_err(|e| SyncError::WatermarkSaveFailed(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .map_err(|e| SyncError::WatermarkSaveFailed(e.to_string()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| SyncError::WatermarkSaveFailed(e.to_string()))?;

        debug!(watermark, path = %self.path.display(), "Watermark saved");
        Ok(())
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Volatile watermark storage for tests.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<Option<TimestampMs>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn load(&self) -> SyncResult<Option<TimestampMs>> {
        let value = self
            .value
            .lock()
            .map_err(|e| SyncError::WatermarkLoadFailed(e.to_string()))?;
        Ok(*value)
    }

    async fn save(&self, watermark: TimestampMs) -> SyncResult<()> {
        let mut value = self
            .value
            .lock()
            .map_err(|e| SyncError::WatermarkSaveFailed(e.to_string()))?;
        *value = Some(watermark);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWatermarkStore::new(dir.path().join("watermark.json"));

        assert_eq!(store.load().await.unwrap(), None);

        store.save(1_700_000_000_000).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(1_700_000_000_000));

        // Overwrite advances
        store.save(1_700_000_099_000).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(1_700_000_099_000));
    }

    #[tokio::test]
    async fn test_file_store_uses_stable_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watermark.json");
        let store = FileWatermarkStore::new(&path);

        store.save(42).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(WATERMARK_KEY));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watermark.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileWatermarkStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SyncError::WatermarkLoadFailed(_)));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryWatermarkStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        store.save(7).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(7));
    }
}
