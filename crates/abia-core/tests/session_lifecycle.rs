use abia_core::session::{AgentKind, FileRef, Session, SessionManager, SessionRepository, Turn};
use abia_core::state::{AppState, StateRepository};
use abia_core::{AbiaError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct InMemorySessions {
    sessions: Mutex<HashMap<String, Session>>,
}

#[async_trait]
impl SessionRepository for InMemorySessions {
    async fn find_by_id(&self, session_id: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Session>> {
        Ok(self.sessions.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
struct InMemoryState {
    state: Mutex<AppState>,
}

#[async_trait]
impl StateRepository for InMemoryState {
    async fn save_state(&self, state: AppState) -> Result<()> {
        *self.state.lock().unwrap() = state;
        Ok(())
    }

    async fn get_state(&self) -> Result<AppState> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn get_active_session(&self) -> Option<String> {
        self.state.lock().unwrap().active_session_id.clone()
    }

    async fn set_active_session(&self, session_id: String) -> Result<()> {
        self.state.lock().unwrap().active_session_id = Some(session_id);
        Ok(())
    }

    async fn get_last_agent(&self) -> Option<AgentKind> {
        self.state.lock().unwrap().last_active_agent
    }

    async fn set_last_agent(&self, agent: AgentKind) -> Result<()> {
        self.state.lock().unwrap().last_active_agent = Some(agent);
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state.lock().unwrap().get(key))
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.state.lock().unwrap().set(key, value);
        Ok(())
    }
}

#[tokio::test]
async fn resume_flow_keeps_every_conversation() {
    let sessions = Arc::new(InMemorySessions::default());
    let state = Arc::new(InMemoryState::default());
    let manager = SessionManager::new(sessions.clone(), state.clone());

    // Startup fallback: nothing to restore, so create.
    assert!(manager.restore_last_session().await.unwrap().is_none());
    let budget = manager.create_new_session().await.unwrap();
    manager.set_active_agent("Excel").await.unwrap();
    manager
        .add_active_file(FileRef::new("/data/budget.xlsx"))
        .await
        .unwrap();
    manager
        .record_exchange(
            &budget,
            vec![
                Turn::user("Analyse ce tableau"),
                Turn::assistant("Deux feuilles trouvées", AgentKind::Excel),
            ],
        )
        .await
        .unwrap();

    let letter = manager.create_new_session().await.unwrap();
    assert_eq!(manager.active_agent().await.unwrap(), AgentKind::Chat);
    assert!(manager.active_files().await.unwrap().is_empty());

    let summaries = manager.list_sessions(10).await.unwrap();
    assert_eq!(summaries.len(), 2);
    let budget_summary = summaries.iter().find(|s| s.id == budget).unwrap();
    assert_eq!(budget_summary.message_count, 2);
    assert_eq!(budget_summary.preview.as_deref(), Some("Analyse ce tableau"));

    let resumed = manager.load_context(&budget).await.unwrap();
    assert_eq!(resumed.active_agent, AgentKind::Excel);
    assert_eq!(resumed.active_files.len(), 1);

    // A restart picks up the resumed session, not the latest one.
    let restarted = SessionManager::new(sessions, state);
    let restored = restarted.restore_last_session().await.unwrap().unwrap();
    assert_eq!(restored.id, budget);
    assert_ne!(restored.id, letter);
}

#[tokio::test]
async fn invalid_agent_is_a_typed_error() {
    let manager = SessionManager::new(
        Arc::new(InMemorySessions::default()),
        Arc::new(InMemoryState::default()),
    );
    manager.create_new_session().await.unwrap();

    match manager.set_active_agent("pilote").await {
        Err(AbiaError::InvalidAgent { value }) => assert_eq!(value, "pilote"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(manager.active_agent().await.unwrap(), AgentKind::Chat);
}
