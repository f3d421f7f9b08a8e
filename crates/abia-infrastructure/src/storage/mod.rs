//! File storage primitives.

pub mod atomic_json;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::path::PathBuf;

/// Loads a JSON file on the blocking pool.
pub async fn load_json<T>(path: PathBuf) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || AtomicJsonFile::<T>::new(path).load())
        .await
        .context("Storage task panicked")?
        .with_context(|| format!("Failed to load {}", display))
}

/// Saves a JSON file atomically on the blocking pool.
pub async fn save_json<T>(path: PathBuf, data: T) -> Result<()>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || AtomicJsonFile::<T>::new(path).save(&data))
        .await
        .context("Storage task panicked")?
        .with_context(|| format!("Failed to save {}", display))
}

/// Locked read-modify-write on the blocking pool.
pub async fn update_json<T, F>(path: PathBuf, default_value: T, f: F) -> Result<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce(&mut T) + Send + 'static,
{
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || AtomicJsonFile::<T>::new(path).update(default_value, f))
        .await
        .context("Storage task panicked")?
        .with_context(|| format!("Failed to update {}", display))
}
