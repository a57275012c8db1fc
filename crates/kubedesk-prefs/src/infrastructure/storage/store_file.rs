//! TOML-backed store file for the preferences store.
//!
//! The file lives in the platform data directory (see
//! [`platform::data_dir`](crate::infrastructure::platform::data_dir)):
//!
//! ```text
//! <data dir>/user-store.toml    current
//! <data dir>/config.toml        legacy name, moved on first load
//! ```
//!
//! # Fallback rules
//!
//! Reading never fails.  A missing file is a first run; an unreadable file or
//! one that is not valid TOML is logged and treated like a first run.  The
//! store never adopts part of a broken document.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Current store file name.
pub const STORE_FILE_NAME: &str = "user-store.toml";
/// File name used by builds before the store was renamed.
pub const LEGACY_STORE_FILE_NAME: &str = "config.toml";

/// Error type for store file writes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing store file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be rendered as TOML.
    #[error("failed to serialize store document: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The store's single backing file.
#[derive(Debug, Clone)]
pub struct StoreFile {
    dir: PathBuf,
}

impl StoreFile {
    /// Creates a handle for the store inside `dir`.  Nothing is touched on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the current store file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE_NAME)
    }

    /// Full path of the legacy store file.
    pub fn legacy_path(&self) -> PathBuf {
        self.dir.join(LEGACY_STORE_FILE_NAME)
    }

    /// Moves the legacy store file to the current path.
    ///
    /// No-op when there is no legacy file or when a current file already
    /// exists.  Returns `true` if a file was moved.  A failed move is logged
    /// and loading continues from whatever is at the current path.
    pub async fn relocate_legacy(&self) -> bool {
        let legacy = self.legacy_path();
        let current = self.path();

        if !path_exists(&legacy).await || path_exists(&current).await {
            return false;
        }

        match tokio::fs::rename(&legacy, &current).await {
            Ok(()) => {
                info!(
                    "moved legacy store file {} to {}",
                    legacy.display(),
                    current.display()
                );
                true
            }
            Err(e) => {
                warn!(
                    "could not move legacy store file {} to {}: {e}",
                    legacy.display(),
                    current.display()
                );
                false
            }
        }
    }

    /// Reads and parses the store document.
    ///
    /// Returns `None` when the file is missing, unreadable, or not valid TOML.
    pub async fn read_document(&self) -> Option<toml::Table> {
        let path = self.path();
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no store file at {}; using defaults", path.display());
                return None;
            }
            Err(e) => {
                warn!("could not read store file {}: {e}; using defaults", path.display());
                return None;
            }
        };

        match toml::from_str::<toml::Table>(&text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("store file {} is not valid TOML: {e}; using defaults", path.display());
                None
            }
        }
    }

    /// Persists `doc`, creating the data directory if needed.
    ///
    /// The document is written to a sibling temp file first and renamed into
    /// place, so a crash mid-write leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] for file-system failures or
    /// [`StorageError::Serialize`] if rendering fails.
    pub async fn write_document(&self, doc: &toml::Table) -> Result<(), StorageError> {
        let content = toml::to_string_pretty(doc)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path();
        let tmp = path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| StorageError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("wrote store file {}", path.display());
        Ok(())
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
