use super::agent::AgentKind;
use super::file_ref::FileRef;
use super::message::Turn;
use super::model::{Session, SessionId, SessionSummary};
use super::repository::SessionRepository;
use crate::error::{AbiaError, Result};
use crate::state::repository::StateRepository;
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the current session and every mutation of it.
///
/// `SessionManager` is responsible for:
/// - Creating new sessions and making them current
/// - Loading stored sessions for resume
/// - Answering history, agent and active-file queries
/// - Persisting the current session after each mutation
///
/// All mutations go through a single async mutex, held across the
/// persistence write, so a switch and its write are never interleaved with
/// another mutation.
pub struct SessionManager {
    /// The current session, `None` until one is created or restored.
    current: Mutex<Option<Session>>,
    /// Persistent storage backend for session data
    session_repository: Arc<dyn SessionRepository>,
    /// Application state repository (active session id, last agent)
    state_repository: Arc<dyn StateRepository>,
}

impl SessionManager {
    /// Creates a new `SessionManager` with repository backends.
    ///
    /// # Arguments
    ///
    /// * `session_repository` - The repository backend for session data persistence
    /// * `state_repository` - The repository backend for application state (e.g., active session ID)
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        state_repository: Arc<dyn StateRepository>,
    ) -> Self {
        Self {
            current: Mutex::new(None),
            session_repository,
            state_repository,
        }
    }

    /// Attempts to restore the last active session on startup.
    ///
    /// # Returns
    ///
    /// `Some(session)` if the session recorded as active still exists, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AbiaError::Storage`] if storage access fails.
    pub async fn restore_last_session(&self) -> Result<Option<Session>> {
        let Some(session_id) = self.state_repository.get_active_session().await else {
            return Ok(None);
        };

        let Some(session) = self
            .session_repository
            .find_by_id(&session_id)
            .await
            .with_context(|| format!("Failed to read session '{}'", session_id))?
        else {
            tracing::warn!(
                "[Session] Last active session {} no longer exists",
                session_id
            );
            return Ok(None);
        };

        let mut current = self.current.lock().await;
        *current = Some(session.clone());
        tracing::info!("[Session] Restored session {}", session.id);
        Ok(Some(session))
    }

    /// Creates a new session and makes it current.
    ///
    /// The new session starts with the chat agent, no files and an empty
    /// history. It replaces the previous current session, which stays in
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns [`AbiaError::Storage`] if the record cannot be written. The
    /// new session remains current in that case.
    pub async fn create_new_session(&self) -> Result<SessionId> {
        let session = Session::new();
        let session_id = session.id.clone();

        let mut current = self.current.lock().await;
        *current = Some(session.clone());

        self.session_repository
            .save(&session)
            .await
            .with_context(|| format!("Failed to save session '{}'", session_id))?;
        self.state_repository
            .set_active_session(session_id.clone())
            .await?;
        drop(current);

        tracing::info!("[Session] Created session {}", session_id);
        Ok(session_id)
    }

    /// Returns a copy of the current session.
    pub async fn current_context(&self) -> Result<Session> {
        let current = self.current.lock().await;
        current.clone().ok_or(AbiaError::NoActiveSession)
    }

    /// Returns the id of the current session, if any.
    pub async fn current_id(&self) -> Option<SessionId> {
        self.current.lock().await.as_ref().map(|s| s.id.clone())
    }

    /// Returns the most recent `limit` turns, most recent last.
    ///
    /// `Some(0)` yields an empty list; `None` yields the full history.
    pub async fn conversation_history(&self, limit: Option<usize>) -> Result<Vec<Turn>> {
        let current = self.current.lock().await;
        let session = current.as_ref().ok_or(AbiaError::NoActiveSession)?;
        Ok(session.recent_turns(limit))
    }

    pub async fn active_agent(&self) -> Result<AgentKind> {
        let current = self.current.lock().await;
        let session = current.as_ref().ok_or(AbiaError::NoActiveSession)?;
        Ok(session.active_agent)
    }

    /// Validates and sets the active agent of the current session.
    ///
    /// # Errors
    ///
    /// - [`AbiaError::InvalidAgent`] when `agent` is unknown; nothing is mutated.
    /// - [`AbiaError::NoActiveSession`] before a session exists.
    /// - [`AbiaError::Storage`] when the session cannot be persisted.
    pub async fn set_active_agent(&self, agent: &str) -> Result<AgentKind> {
        let agent = AgentKind::parse(agent)?;
        self.set_active_agent_kind(agent).await
    }

    /// Typed variant of [`set_active_agent`](Self::set_active_agent).
    pub async fn set_active_agent_kind(&self, agent: AgentKind) -> Result<AgentKind> {
        self.mutate_current(|session| {
            if session.active_agent != agent {
                session.active_agent = agent;
                session.touch();
            }
            true
        })
        .await?;

        if let Err(e) = self.state_repository.set_last_agent(agent).await {
            tracing::warn!("[Session] Failed to remember last agent: {}", e);
        }
        tracing::debug!("[Session] Active agent set to {}", agent);
        Ok(agent)
    }

    pub async fn active_files(&self) -> Result<Vec<FileRef>> {
        let current = self.current.lock().await;
        let session = current.as_ref().ok_or(AbiaError::NoActiveSession)?;
        Ok(session.active_files.clone())
    }

    /// Attaches a file to the current session.
    ///
    /// Returns `false` (and writes nothing) when a file with the same path is
    /// already attached.
    pub async fn add_active_file(&self, file: FileRef) -> Result<bool> {
        self.mutate_current(move |session| session.attach_file(file))
            .await
    }

    /// Detaches a file by path. Returns whether anything was removed.
    pub async fn remove_active_file(&self, path: &str) -> Result<bool> {
        self.mutate_current(|session| session.detach_file(path))
            .await
    }

    pub async fn set_metadata(&self, key: &str, value: Value) -> Result<()> {
        self.mutate_current(|session| {
            session.metadata.insert(key.to_string(), value);
            session.touch();
            true
        })
        .await?;
        Ok(())
    }

    pub async fn metadata(&self, key: &str) -> Result<Option<Value>> {
        let current = self.current.lock().await;
        let session = current.as_ref().ok_or(AbiaError::NoActiveSession)?;
        Ok(session.metadata.get(key).cloned())
    }

    /// Lists stored sessions, most recently updated first.
    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let mut sessions = self
            .session_repository
            .list_all()
            .await
            .context("Failed to list sessions")?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions
            .iter()
            .take(limit)
            .map(Session::summary)
            .collect())
    }

    /// Makes a stored session current.
    ///
    /// # Errors
    ///
    /// Returns [`AbiaError::SessionNotFound`] for an unknown id, or the state
    /// store error when the active id cannot be saved. Either way the
    /// current session is left unchanged.
    pub async fn load_context(&self, session_id: &str) -> Result<Session> {
        let mut current = self.current.lock().await;

        let session = self
            .session_repository
            .find_by_id(session_id)
            .await
            .with_context(|| format!("Failed to read session '{}'", session_id))?
            .ok_or_else(|| AbiaError::session_not_found(session_id))?;

        self.state_repository
            .set_active_session(session.id.clone())
            .await?;
        *current = Some(session.clone());
        drop(current);

        tracing::info!("[Session] Switched to session {}", session.id);
        Ok(session)
    }

    /// Appends turns to the session they were issued for.
    ///
    /// When that session is still current it is updated in memory and
    /// persisted. Otherwise the stored record is updated, so an answer that
    /// completes after the user switched conversations still lands in the
    /// right history.
    pub async fn record_exchange(&self, session_id: &str, turns: Vec<Turn>) -> Result<()> {
        let mut current = self.current.lock().await;

        if let Some(session) = current.as_mut()
            && session.id == session_id
        {
            session.append_turns(turns);
            let snapshot = session.clone();
            return self.persist(&snapshot).await;
        }

        let mut stored = self
            .session_repository
            .find_by_id(session_id)
            .await
            .with_context(|| format!("Failed to read session '{}'", session_id))?
            .ok_or_else(|| AbiaError::session_not_found(session_id))?;
        stored.append_turns(turns);
        self.persist(&stored).await?;
        drop(current);

        tracing::debug!(
            "[Session] Recorded exchange into background session {}",
            session_id
        );
        Ok(())
    }

    /// Applies `f` to the current session and persists it when `f` reports a change.
    async fn mutate_current<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Session) -> bool,
    {
        let mut current = self.current.lock().await;
        let session = current.as_mut().ok_or(AbiaError::NoActiveSession)?;
        if !f(session) {
            return Ok(false);
        }
        let snapshot = session.clone();
        self.persist(&snapshot).await?;
        Ok(true)
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        self.session_repository
            .save(session)
            .await
            .with_context(|| format!("Failed to save session '{}'", session.id))?;
        Ok(())
    }
}
