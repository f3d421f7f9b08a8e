//! State repository trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::session::AgentKind;
use crate::state::model::AppState;

/// Repository for managing application state.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Saves the app state to storage.
    async fn save_state(&self, state: AppState) -> Result<()>;

    async fn get_state(&self) -> Result<AppState>;

    async fn get_active_session(&self) -> Option<String>;

    async fn set_active_session(&self, session_id: String) -> Result<()>;

    async fn get_last_agent(&self) -> Option<AgentKind>;

    async fn set_last_agent(&self, agent: AgentKind) -> Result<()>;

    /// Reads a preference; `None` when the key was never set.
    async fn get_value(&self, key: &str) -> Result<Option<Value>>;

    async fn set_value(&self, key: &str, value: Value) -> Result<()>;
}
