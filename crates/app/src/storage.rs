//! Durable storage for the session payload.
//!
//! The payload lives under one fixed key. Stores only move strings; decoding
//! is the session manager's job.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Key the session payload is stored under.
pub const SESSION_STORAGE_KEY: &str = "stockroom.session";

/// Errors raised by a session store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("session storage I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key-value storage scoped to the session key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the stored payload, `None` if nothing is stored.
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored payload.
    async fn save(&self, payload: &str) -> Result<(), StorageError>;

    /// Remove the stored payload. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Stores the session as a file named [`SESSION_STORAGE_KEY`] in a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the session file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_STORAGE_KEY)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{SESSION_STORAGE_KEY}.tmp"))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let path = self.path();
        match tokio::fs::read_to_string(&path).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    async fn save(&self, payload: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;

        // Temp file + rename: the session file is never partially written.
        let temp = self.temp_path();
        let result = match write_private(&temp, payload).await {
            Ok(()) => {
                let path = self.path();
                tokio::fs::rename(&temp, &path)
                    .await
                    .map_err(io_error(&path))
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            discard(&temp).await;
        }
        result
    }

    async fn clear(&self) -> Result<(), StorageError> {
        remove_if_exists(&self.path()).await
    }
}

/// Write `payload` to a fresh file readable only by the owner.
async fn write_private(path: &Path, payload: &str) -> Result<(), StorageError> {
    // A leftover temp file keeps whatever mode it was created with.
    remove_if_exists(path).await?;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await.map_err(io_error(path))?;
    file.write_all(payload.as_bytes())
        .await
        .map_err(io_error(path))?;
    file.sync_all().await.map_err(io_error(path))
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path)(e)),
    }
}

async fn discard(temp: &Path) {
    if let Err(e) = remove_if_exists(temp).await {
        tracing::warn!(error = %e, "Could not remove temporary session file");
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    payload: Mutex<Option<String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `payload`, as if written by an earlier run.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Mutex::new(Some(payload.into())),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.payload.lock().await.clone())
    }

    async fn save(&self, payload: &str) -> Result<(), StorageError> {
        *self.payload.lock().await = Some(payload.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.payload.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested"));

        assert!(store.load().await.unwrap().is_none());

        store.save("{\"a\":1}").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(!store.temp_path().exists());

        store.save("{\"b\":2}").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("{\"b\":2}"));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.save("{}").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_file_store_save_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = FileSessionStore::new(&blocker);
        let err = store.save("{}").await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_temp_file_does_not_widen_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        std::fs::write(store.temp_path(), "stale").unwrap();
        std::fs::set_permissions(store.temp_path(), std::fs::Permissions::from_mode(0o644))
            .unwrap();

        store.save("{}").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("occupied"), "x").unwrap();

        let err = store.save("{}").await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::with_payload("stored");
        assert_eq!(store.load().await.unwrap().as_deref(), Some("stored"));
        store.save("replaced").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("replaced"));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
