//! Session domain model.

use super::agent::AgentKind;
use super::file_ref::FileRef;
use super::message::{Turn, TurnRole};
use crate::usage::TokenStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum number of characters kept in a session preview.
pub const PREVIEW_MAX_CHARS: usize = 80;

pub type SessionId = String;

/// One continuous user interaction thread.
///
/// A session owns its active agent, attached files and turn history. It is
/// persisted as one record and never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// UUID v4, generated at creation.
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub active_agent: AgentKind,
    #[serde(default)]
    pub active_files: Vec<FileRef>,
    /// Append-only.
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response: Option<String>,
}

impl Session {
    /// Allocates an empty session with a fresh identifier and the chat agent.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            active_agent: AgentKind::Chat,
            active_files: Vec::new(),
            history: Vec::new(),
            metadata: BTreeMap::new(),
            last_query: None,
            last_response: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Appends turns in the given order and refreshes the last query/response copies.
    pub fn append_turns(&mut self, turns: impl IntoIterator<Item = Turn>) {
        for turn in turns {
            match turn.role {
                TurnRole::User => self.last_query = Some(turn.content.clone()),
                TurnRole::Assistant => self.last_response = Some(turn.content.clone()),
            }
            self.history.push(turn);
        }
        self.touch();
    }

    /// Returns the last `limit` turns, most recent last. `None` returns everything.
    pub fn recent_turns(&self, limit: Option<usize>) -> Vec<Turn> {
        match limit {
            Some(limit) => {
                let start = self.history.len().saturating_sub(limit);
                self.history[start..].to_vec()
            }
            None => self.history.clone(),
        }
    }

    /// Adds a file unless one with the same path is already attached.
    pub fn attach_file(&mut self, file: FileRef) -> bool {
        if self.active_files.iter().any(|f| f.path == file.path) {
            return false;
        }
        self.active_files.push(file);
        self.touch();
        true
    }

    pub fn detach_file(&mut self, path: &str) -> bool {
        let before = self.active_files.len();
        self.active_files.retain(|f| f.path != path);
        let changed = self.active_files.len() != before;
        if changed {
            self.touch();
        }
        changed
    }

    pub fn summary(&self) -> SessionSummary {
        let preview = self
            .history
            .iter()
            .find(|t| t.is_user())
            .map(|t| truncate_chars(&t.content, PREVIEW_MAX_CHARS));

        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            active_agent: self.active_agent,
            message_count: self.history.len(),
            active_files_count: self.active_files.len(),
            preview,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

/// Listing entry returned by `list-sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active_agent: AgentKind,
    pub message_count: usize,
    pub active_files_count: usize,
    /// First user message, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Session fields plus the process-wide token statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    #[serde(flatten)]
    pub session: Session,
    pub token_stats: TokenStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new();
        assert_eq!(session.active_agent, AgentKind::Chat);
        assert!(session.history.is_empty());
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
        assert_ne!(Session::new().id, session.id);
    }

    #[test]
    fn test_recent_turns_bounds() {
        let mut session = Session::new();
        session.append_turns((0..5).map(|i| Turn::user(format!("q{}", i))));

        assert!(session.recent_turns(Some(0)).is_empty());
        let last_two = session.recent_turns(Some(2));
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[1].content, "q4");
        assert_eq!(session.recent_turns(Some(50)).len(), 5);
        assert_eq!(session.recent_turns(None).len(), 5);
    }

    #[test]
    fn test_append_tracks_last_query_and_response() {
        let mut session = Session::new();
        session.append_turns(vec![
            Turn::user("Bonjour"),
            Turn::assistant("Salut", AgentKind::Chat),
        ]);
        assert_eq!(session.last_query.as_deref(), Some("Bonjour"));
        assert_eq!(session.last_response.as_deref(), Some("Salut"));
    }

    #[test]
    fn test_attach_file_dedupes_by_path() {
        let mut session = Session::new();
        assert!(session.attach_file(FileRef::new("/tmp/a.xlsx")));
        assert!(!session.attach_file(FileRef::new("/tmp/a.xlsx")));
        assert_eq!(session.active_files.len(), 1);
        assert!(session.detach_file("/tmp/a.xlsx"));
        assert!(!session.detach_file("/tmp/a.xlsx"));
    }

    #[test]
    fn test_summary_preview_is_truncated() {
        let mut session = Session::new();
        session.append_turns(vec![Turn::user("x".repeat(200))]);
        let summary = session.summary();
        assert_eq!(summary.message_count, 1);
        let preview = summary.preview.unwrap();
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 1);
    }

    #[test]
    fn test_snapshot_flattens_session() {
        let snapshot = ContextSnapshot {
            session: Session::new(),
            token_stats: TokenStats::default(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("id").is_some());
        assert_eq!(value["activeAgent"], "chat");
        assert!(value.get("tokenStats").is_some());
    }
}
