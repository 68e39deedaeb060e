//! Pairing key storage.
//!
//! The TV hands out a `client-key` when the user accepts the pairing prompt.
//! Presenting it on later registrations skips the prompt, so the key must
//! outlive the process. [`KeyStore`] abstracts where it is kept.
//!
//! | Store | Persistence |
//! |-------|-------------|
//! | [`MemoryKeyStore`] | Process lifetime |
//! | [`FileKeyStore`] | JSON file, atomically replaced |

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// KeyStore
// ============================================================================

/// Storage for the TV's pairing key.
pub trait KeyStore: Send + Sync {
    /// Returns the stored key, if any. An empty key counts as absent.
    fn key(&self) -> Option<String>;

    /// Replaces the stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be persisted.
    fn store_key(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MemoryKeyStore
// ============================================================================

/// Key store held in memory.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    key: RwLock<Option<String>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with `key`.
    #[must_use]
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(key.into())),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn key(&self) -> Option<String> {
        self.key.read().clone().filter(|k| !k.is_empty())
    }

    fn store_key(&self, key: &str) -> Result<()> {
        *self.key.write() = Some(key.to_string());
        Ok(())
    }
}

// ============================================================================
// FileKeyStore
// ============================================================================

/// On-disk format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredKey {
    #[serde(rename = "client-key", default, skip_serializing_if = "Option::is_none")]
    client_key: Option<String>,
}

/// Key store backed by a small JSON file (`{"client-key": "..."}`).
///
/// The file is read once on open and rewritten through a temporary file in
/// the same directory, so a crash never leaves a truncated key behind.
#[derive(Debug)]
pub struct FileKeyStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileKeyStore {
    /// Opens the store at `path`. A missing file means no key yet.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file exists but cannot be read
    /// - [`Error::Json`] if the file is not valid JSON
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let cached = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<StoredKey>(&text)?.client_key,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), has_key = cached.is_some(), "Opened key store");

        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, key: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let stored = StoredKey {
            client_key: Some(key.to_string()),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &stored)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn key(&self) -> Option<String> {
        self.cached.read().clone().filter(|k| !k.is_empty())
    }

    fn store_key(&self, key: &str) -> Result<()> {
        self.persist(key)?;
        *self.cached.write() = Some(key.to_string());
        debug!(path = %self.path.display(), "Stored pairing key");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
