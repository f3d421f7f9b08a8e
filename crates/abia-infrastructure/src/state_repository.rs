//! JSON-file StateRepository implementation.

use crate::paths::AbiaPaths;
use crate::storage::{load_json, save_json};
use abia_core::error::{AbiaError, Result};
use abia_core::session::AgentKind;
use abia_core::state::{AppState, StateRepository};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Preferences store backed by `state.json`.
///
/// The state is cached in memory after the first load. Writes are
/// serialized by the cache lock and replace the file atomically.
pub struct StateRepositoryImpl {
    path: PathBuf,
    cache: RwLock<Option<AppState>>,
}

impl StateRepositoryImpl {
    pub fn new(paths: &AbiaPaths) -> Self {
        Self::with_file(paths.state_file())
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    async fn load_state(&self) -> Result<AppState> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut cache = self.cache.write().await;
        let loaded = match cache.as_ref() {
            Some(cached) => cached.clone(),
            None => self.read_from_disk().await,
        };
        *cache = Some(loaded.clone());
        Ok(loaded)
    }

    async fn read_from_disk(&self) -> AppState {
        match load_json::<AppState>(self.path.clone()).await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                // A corrupt preferences file must not keep the app from starting.
                tracing::warn!("[State] Falling back to defaults: {:#}", e);
                AppState::default()
            }
        }
    }

    /// Applies `f` to the cached state and writes the result.
    async fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppState),
    {
        let mut cache = self.cache.write().await;
        let mut state = match cache.as_ref() {
            Some(cached) => cached.clone(),
            None => self.read_from_disk().await,
        };
        f(&mut state);
        save_json(self.path.clone(), state.clone())
            .await
            .map_err(|e| AbiaError::storage(format!("{:#}", e)))?;
        *cache = Some(state);
        Ok(())
    }
}

#[async_trait]
impl StateRepository for StateRepositoryImpl {
    async fn save_state(&self, state: AppState) -> Result<()> {
        self.modify(move |current| *current = state).await
    }

    async fn get_state(&self) -> Result<AppState> {
        self.load_state().await
    }

    async fn get_active_session(&self) -> Option<String> {
        self.load_state().await.ok()?.active_session_id
    }

    async fn set_active_session(&self, session_id: String) -> Result<()> {
        self.modify(move |state| state.active_session_id = Some(session_id))
            .await
    }

    async fn get_last_agent(&self) -> Option<AgentKind> {
        self.load_state().await.ok()?.last_active_agent
    }

    async fn set_last_agent(&self, agent: AgentKind) -> Result<()> {
        self.modify(move |state| state.last_active_agent = Some(agent))
            .await
    }

    async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load_state().await?.get(key))
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        self.modify(move |state| state.set(&key, value)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let repo = StateRepositoryImpl::with_file(temp.path().join("state.json"));

        let state = repo.get_state().await.unwrap();
        assert_eq!(state.language, "fr");
        assert!(repo.get_active_session().await.is_none());
        assert_eq!(repo.get_value("fontSize").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_persist_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");

        let repo = StateRepositoryImpl::with_file(path.clone());
        repo.set_value("darkMode", json!(true)).await.unwrap();
        repo.set_value("fontSize", json!("large")).await.unwrap();
        repo.set_active_session("abc".to_string()).await.unwrap();
        repo.set_last_agent(AgentKind::Translation).await.unwrap();

        let reopened = StateRepositoryImpl::with_file(path);
        assert_eq!(reopened.get_value("darkMode").await.unwrap(), Some(json!(true)));
        assert_eq!(reopened.get_value("fontSize").await.unwrap(), Some(json!("large")));
        assert_eq!(reopened.get_active_session().await.as_deref(), Some("abc"));
        assert_eq!(reopened.get_last_agent().await, Some(AgentKind::Translation));
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let repo = StateRepositoryImpl::with_file(path.clone());
        assert_eq!(repo.get_state().await.unwrap(), AppState::default());

        repo.set_value("language", json!("en")).await.unwrap();
        let reopened = StateRepositoryImpl::with_file(path);
        assert_eq!(reopened.get_state().await.unwrap().language, "en");
    }
}
