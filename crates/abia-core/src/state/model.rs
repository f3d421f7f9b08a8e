//! Application state domain models.
//!
//! Contains preferences and bookkeeping that persist across restarts.

use crate::session::AgentKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default UI language.
pub const DEFAULT_LANGUAGE: &str = "fr";

/// Last known window geometry, restored by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default)]
    pub maximized: bool,
}

/// Application state that persists across restarts.
///
/// # File Location
///
/// `<data dir>/state.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub dark_mode: bool,
    /// Agent selected the last time a session was active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_agent: Option<AgentKind>,
    /// Session restored on startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_state: Option<WindowState>,
    /// Free-form values set through `set-store-value`.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            language: default_language(),
            dark_mode: false,
            last_active_agent: None,
            active_session_id: None,
            window_state: None,
            values: BTreeMap::new(),
        }
    }
}

impl AppState {
    /// Reads a key, looking at the typed fields first and the free-form map second.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "language" => Some(Value::String(self.language.clone())),
            "darkMode" => Some(Value::Bool(self.dark_mode)),
            "lastActiveAgent" => self
                .last_active_agent
                .map(|a| Value::String(a.to_string())),
            "activeSessionId" => self.active_session_id.clone().map(Value::String),
            "windowState" => self
                .window_state
                .and_then(|w| serde_json::to_value(w).ok()),
            other => self.values.get(other).cloned(),
        }
    }

    /// Writes a key. Typed fields only accept values of their own shape;
    /// anything else lands in the free-form map.
    pub fn set(&mut self, key: &str, value: Value) {
        match (key, &value) {
            ("language", Value::String(lang)) => self.language = lang.clone(),
            ("darkMode", Value::Bool(flag)) => self.dark_mode = *flag,
            ("windowState", _) => match serde_json::from_value(value.clone()) {
                Ok(window) => self.window_state = Some(window),
                Err(_) => {
                    self.values.insert(key.to_string(), value);
                }
            },
            _ => {
                self.values.insert(key.to_string(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let state = AppState::default();
        assert_eq!(state.language, "fr");
        assert_eq!(state.get("darkMode"), Some(json!(false)));
        assert_eq!(state.get("missing"), None);
    }

    #[test]
    fn test_typed_and_free_keys() {
        let mut state = AppState::default();
        state.set("language", json!("en"));
        state.set("fontSize", json!("large"));
        state.set("windowState", json!({"width": 1200, "height": 800}));

        assert_eq!(state.language, "en");
        assert_eq!(state.get("fontSize"), Some(json!("large")));
        assert_eq!(state.window_state.unwrap().width, 1200);
    }

    #[test]
    fn test_mistyped_language_goes_to_free_map() {
        let mut state = AppState::default();
        state.set("language", json!(42));
        assert_eq!(state.language, "fr");
        assert_eq!(state.values.get("language"), Some(&json!(42)));
    }
}
