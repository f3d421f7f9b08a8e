//! Directory-backed SessionRepository implementation.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! └── sessions/
//!     ├── 7f0c...-uuid.json
//!     └── 91aa...-uuid.json
//! ```

use crate::paths::AbiaPaths;
use crate::storage::{load_json, save_json};
use abia_core::session::{Session, SessionRepository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores one JSON file per session, written atomically.
pub struct AsyncDirSessionRepository {
    sessions_dir: PathBuf,
}

impl AsyncDirSessionRepository {
    /// Creates a repository rooted at `<data dir>/sessions`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn new(paths: &AbiaPaths) -> Result<Self> {
        Self::with_dir(paths.sessions_dir()).await
    }

    pub async fn with_dir(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir)
            .await
            .context("Failed to create sessions directory")?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Maps an id to its file. Ids that could escape the directory map to `None`.
    fn file_for(&self, session_id: &str) -> Option<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.sessions_dir.join(format!("{}.json", session_id)))
    }
}

#[async_trait]
impl SessionRepository for AsyncDirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let Some(path) = self.file_for(session_id) else {
            tracing::debug!("[SessionRepo] Rejected session id {:?}", session_id);
            return Ok(None);
        };
        load_json::<Session>(path).await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let path = self
            .file_for(&session.id)
            .with_context(|| format!("Invalid session id '{}'", session.id))?;
        save_json(path, session.clone()).await
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut entries = fs::read_dir(&self.sessions_dir)
            .await
            .with_context(|| format!("Failed to read {}", self.sessions_dir.display()))?;

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_json::<Session>(path.clone()).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("[SessionRepo] Skipping unreadable {}: {:#}", path.display(), e)
                }
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abia_core::session::{AgentKind, FileRef, Turn};
    use tempfile::TempDir;

    async fn setup() -> (AsyncDirSessionRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = AsyncDirSessionRepository::with_dir(temp_dir.path().join("sessions"))
            .await
            .unwrap();
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let (repo, _temp) = setup().await;
        let mut session = Session::new();
        session.active_agent = AgentKind::Document;
        session.attach_file(FileRef::new("/tmp/rapport.pdf"));
        session.append_turns(vec![Turn::user("Résume ce document")]);

        repo.save(&session).await.unwrap();
        let loaded = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let (repo, _temp) = setup().await;
        assert!(repo.find_by_id("unknown-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_path_traversal_ids_are_rejected() {
        let (repo, temp) = setup().await;
        std::fs::write(temp.path().join("secret.json"), "{}").unwrap();
        assert!(repo.find_by_id("../secret").await.unwrap().is_none());

        let mut session = Session::new();
        session.id = "../escape".to_string();
        assert!(repo.save(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_save_replaces_record() {
        let (repo, _temp) = setup().await;
        let mut session = Session::new();
        repo.save(&session).await.unwrap();
        session.active_agent = AgentKind::Mail;
        repo.save(&session).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].active_agent, AgentKind::Mail);
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_and_foreign_files() {
        let (repo, _temp) = setup().await;
        repo.save(&Session::new()).await.unwrap();
        repo.save(&Session::new()).await.unwrap();
        std::fs::write(repo.sessions_dir().join("broken.json"), "{oops").unwrap();
        std::fs::write(repo.sessions_dir().join("notes.txt"), "hello").unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }
}
