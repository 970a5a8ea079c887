use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

use crate::crypto::{self, CryptoError, DEFAULT_PASSPHRASE};
use crate::settings::{DocumentKind, Settings, SoundAsset, SoundLibrary, StoredDocument};

/// Errors that can occur while reading or writing a stored document
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} does not exist")]
    Missing(PathBuf),

    #[error("{path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to encrypt document: {0}")]
    Crypto(#[from] CryptoError),
}

/// Encrypted-at-rest store for the settings and sounds documents.
///
/// Each save rewrites the whole file through a temporary sibling and a
/// rename, so a reader sees either the old or the new document. Loads always
/// hit the disk; nothing is cached between calls.
#[derive(Debug)]
pub struct SecureStore {
    dir: PathBuf,
    passphrase: String,
    write_lock: Mutex<()>,
}

impl SecureStore {
    /// Open the store under `dir` with the built-in passphrase, creating the
    /// directory and seeding default documents on first run.
    pub fn open(dir: PathBuf) -> Result<Self, StorageError> {
        Self::open_with_passphrase(dir, DEFAULT_PASSPHRASE)
    }

    pub fn open_with_passphrase(dir: PathBuf, passphrase: &str) -> Result<Self, StorageError> {
        let store = Self {
            dir,
            passphrase: passphrase.to_string(),
            write_lock: Mutex::new(()),
        };
        store.ensure_dir()?;
        store.seed_if_missing::<Settings>();
        store.seed_if_missing::<SoundLibrary>();
        Ok(store)
    }

    fn seed_if_missing<D: StoredDocument>(&self) {
        let path = self.path_for(D::KIND);
        if path.exists() {
            return;
        }
        log::info!("Creating default {}", path.display());
        if let Err(e) = self.save(&D::default()) {
            log::warn!("Failed to seed {}: {}", path.display(), e);
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: DocumentKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Create the data directory if needed. Idempotent.
    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guard protects no data, so a poisoned lock is still usable.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serialize, encrypt and atomically replace the document's file.
    pub fn save<D: StoredDocument>(&self, document: &D) -> Result<(), StorageError> {
        let _guard = self.lock();
        self.write_document(document)
    }

    fn write_document<D: StoredDocument>(&self, document: &D) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let json = serde_json::to_vec(document)?;
        let envelope = crypto::encrypt(&json, &self.passphrase)?;

        // A uniquely named sibling is removed on drop if anything below fails.
        let path = self.path_for(D::KIND);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(envelope.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        log::debug!("Saved {} ({} bytes)", path.display(), envelope.len());
        Ok(())
    }

    /// Read and decrypt a document, reporting exactly why it failed.
    pub fn try_load<D: StoredDocument>(&self) -> Result<D, StorageError> {
        let path = self.path_for(D::KIND);
        let corrupt = |reason: String| StorageError::Corrupt {
            path: path.clone(),
            reason,
        };

        let envelope = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::Missing(path.clone()))
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(corrupt("not valid UTF-8".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let plaintext =
            crypto::decrypt(&envelope, &self.passphrase).map_err(|e| corrupt(e.to_string()))?;
        serde_json::from_slice(&plaintext).map_err(|e| corrupt(e.to_string()))
    }

    /// Load a document, falling back to its default on any failure.
    pub fn load<D: StoredDocument>(&self) -> D {
        match self.try_load() {
            Ok(document) => document,
            Err(StorageError::Missing(path)) => {
                log::debug!("{} not found, using defaults", path.display());
                D::default()
            }
            Err(e) => {
                log::warn!("Failed to load {:?} document, using defaults: {}", D::KIND, e);
                D::default()
            }
        }
    }

    /// Store a clip at `(category, position)`, replacing what was there.
    ///
    /// An unreadable sounds file is left untouched and reported; only a
    /// missing file starts a fresh library.
    pub fn save_sound(
        &self,
        category: &str,
        position: u32,
        name: &str,
        payload: Vec<u8>,
    ) -> Result<SoundAsset, StorageError> {
        let _guard = self.lock();
        let mut sounds = match self.try_load::<SoundLibrary>() {
            Ok(sounds) => sounds,
            Err(StorageError::Missing(_)) => SoundLibrary::default(),
            Err(e) => return Err(e),
        };
        let asset = SoundAsset::new(name, payload);
        sounds.insert(category, position, asset.clone());
        self.write_document(&sounds)?;
        log::info!("Saved sound '{}' at {}/{}", name, category, position);
        Ok(asset)
    }

    pub fn sounds_by_category(&self, category: &str) -> BTreeMap<u32, SoundAsset> {
        self.load::<SoundLibrary>().category(category)
    }

    pub fn find_sound(&self, id: &str) -> Option<SoundAsset> {
        self.load::<SoundLibrary>().find_by_id(id).cloned()
    }
}
