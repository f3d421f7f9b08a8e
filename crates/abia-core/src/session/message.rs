//! Conversation turn types.

use super::agent::AgentKind;
use super::file_ref::FileRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message exchange unit within a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Agent that answered (assistant turns) or was targeted (user turns).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            agent: None,
            file: None,
        }
    }

    pub fn assistant(content: impl Into<String>, agent: AgentKind) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            agent: Some(agent),
            file: None,
        }
    }

    pub fn with_agent(mut self, agent: AgentKind) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_file(mut self, file: Option<FileRef>) -> Self {
        self.file = file;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }
}
