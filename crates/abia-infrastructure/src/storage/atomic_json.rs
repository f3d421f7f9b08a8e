//! Atomic JSON file operations.
//!
//! Every persisted record (state, sessions, token stats, vector snapshot)
//! goes through this type so a crash mid-write never leaves a truncated file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during atomic JSON operations.
#[derive(Debug, Error)]
pub enum AtomicJsonError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Lock error on {path}: {message}")]
    Lock { path: PathBuf, message: String },
    #[error("Invalid path {0}")]
    InvalidPath(PathBuf),
}

/// A handle to a JSON file that is replaced atomically on every save.
///
/// - Writes go to `.<name>.tmp` in the same directory, are fsynced, then renamed over the target.
/// - [`update`](Self::update) holds an exclusive `fs2` lock on `<name>.lock` for the read-modify-write.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, AtomicJsonError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AtomicJsonError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| AtomicJsonError::Json {
                path: self.path.clone(),
                source,
            })
    }

    /// Serializes `data` and replaces the file with it.
    pub fn save(&self, data: &T) -> Result<(), AtomicJsonError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicJsonError::InvalidPath(self.path.clone()))?;
        fs::create_dir_all(parent).map_err(|source| self.io_err(source))?;

        let json = serde_json::to_string_pretty(data).map_err(|source| AtomicJsonError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path).map_err(|source| self.io_err(source))?;
        tmp_file
            .write_all(json.as_bytes())
            .and_then(|_| tmp_file.sync_all())
            .map_err(|source| self.io_err(source))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|source| self.io_err(source))?;
        Ok(())
    }

    /// Read-modify-write under an exclusive lock.
    ///
    /// `default_value` seeds the data when the file does not exist yet. The
    /// updated value is returned.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<T, AtomicJsonError>
    where
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data);
        self.save(&data)?;
        Ok(data)
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicJsonError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicJsonError::InvalidPath(self.path.clone()))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| AtomicJsonError::InvalidPath(self.path.clone()))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    fn io_err(&self, source: std::io::Error) -> AtomicJsonError {
        AtomicJsonError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Exclusive lock held on `<file>.lock`, released on drop.
struct FileLock {
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicJsonError> {
        use fs2::FileExt;

        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|source| AtomicJsonError::Io {
                path: lock_path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| AtomicJsonError::Io {
                path: lock_path.clone(),
                source,
            })?;

        file.lock_exclusive().map_err(|e| AtomicJsonError::Lock {
            path: lock_path.clone(),
            message: e.to_string(),
        })?;

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.lock_path);
    }
}
