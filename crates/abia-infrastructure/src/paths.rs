//! Unified path management for ABIA data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/abia/              # Data directory (or --data-dir)
//! ├── config.toml              # Application configuration
//! ├── state.json               # Preferences and active session id
//! ├── token_stats.json         # Global token usage
//! ├── sessions/                # One JSON record per session
//! ├── vectorstore/
//! │   └── vectors.json         # Memory snapshot (texts + metadata)
//! └── logs/
//!     └── abia.log.YYYY-MM-DD
//!
//! ~/Downloads/ABIA_Traductions # Translated documents
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_DIR_NAME: &str = "abia";
pub const TRANSLATIONS_DIR_NAME: &str = "ABIA_Traductions";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

/// Resolves every file location from one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiaPaths {
    base: PathBuf,
}

impl AbiaPaths {
    /// Uses `base` when given, otherwise `<platform config dir>/abia`.
    pub fn new(base: Option<&Path>) -> Result<Self, PathError> {
        let base = match base {
            Some(base) => base.to_path_buf(),
            None => dirs::config_dir()
                .ok_or(PathError::HomeDirNotFound)?
                .join(APP_DIR_NAME),
        };
        Ok(Self { base })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.base.join("state.json")
    }

    pub fn token_stats_file(&self) -> PathBuf {
        self.base.join("token_stats.json")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.base.join("sessions")
    }

    pub fn vector_store_file(&self) -> PathBuf {
        self.base.join("vectorstore").join("vectors.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// Creates the base, sessions and logs directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.sessions_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

/// Folder receiving translated documents.
///
/// `override_dir` wins; then the platform downloads dir; then `~/Downloads`.
pub fn translations_dir(override_dir: Option<&Path>) -> Result<PathBuf, PathError> {
    let parent = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => match dirs::download_dir() {
            Some(dir) => dir,
            None => dirs::home_dir()
                .ok_or(PathError::HomeDirNotFound)?
                .join("Downloads"),
        },
    };
    Ok(parent.join(TRANSLATIONS_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_custom_base() {
        let paths = AbiaPaths::new(Some(Path::new("/tmp/abia-test"))).unwrap();
        assert_eq!(paths.state_file(), PathBuf::from("/tmp/abia-test/state.json"));
        assert_eq!(
            paths.vector_store_file(),
            PathBuf::from("/tmp/abia-test/vectorstore/vectors.json")
        );
        assert_eq!(paths.sessions_dir(), PathBuf::from("/tmp/abia-test/sessions"));
    }

    #[test]
    fn test_translations_dir_override() {
        let dir = translations_dir(Some(Path::new("/srv/out"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/out/ABIA_Traductions"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let paths = AbiaPaths::new(Some(temp.path())).unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.sessions_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
