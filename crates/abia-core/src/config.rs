//! Application configuration model.
//!
//! Every field has a default so a partial (or missing) `config.toml` is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_LLM_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_DEEPL_URL: &str = "https://api.deepl.com/v2";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: GeneralConfig,
    pub llm: LlmConfig,
    pub translation: TranslationConfig,
    pub python: PythonConfig,
    pub storage: StorageConfig,
    pub tasks: TasksConfig,
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub language: String,
    pub dark_mode: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            language: "fr".to_string(),
            dark_mode: false,
        }
    }
}

/// OpenAI-compatible chat completion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    /// Empty means "not configured"; chat answers then fail with a provider error.
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            api_key: String::new(),
            api_url: DEFAULT_LLM_URL.to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub api_key: String,
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Parent of the `ABIA_Traductions` folder; the user's downloads dir when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_DEEPL_URL.to_string(),
            poll_interval_ms: 2000,
            max_poll_attempts: 150,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub interpreter: String,
    /// Directory holding `excel_processor.py` and `document_extractor.py`.
    pub scripts_dir: PathBuf,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            scripts_dir: PathBuf::from("python"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of recent turns handed to agents as context.
    pub context_window: usize,
    /// Default page size for `list-sessions`.
    pub list_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            context_window: 10,
            list_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    pub vector_flush_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            vector_flush_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub enabled: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    /// Parses a TOML document, filling missing fields with defaults.
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// Recognized variables: `ABIA_LLM_API_KEY` (wins over `DEEPSEEK_API_KEY`),
    /// `DEEPL_API_KEY` and `ABIA_PYTHON`. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ABIA_LLM_API_KEY").or_else(|| get("DEEPSEEK_API_KEY")) {
            self.llm.api_key = key;
        }
        if let Some(key) = get("DEEPL_API_KEY") {
            self.translation.api_key = key;
        }
        if let Some(python) = get("ABIA_PYTHON") {
            self.python.interpreter = python;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "deepseek");
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.storage.list_limit, 10);
        assert_eq!(config.storage.context_window, 10);
        assert_eq!(config.translation.max_poll_attempts, 150);
        assert!(!config.llm.is_configured());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [llm]
            model = "deepseek-reasoner"
            temperature = 0.2

            [translation]
            poll_interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "deepseek-reasoner");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.translation.poll_interval_ms, 500);
        assert_eq!(config.translation.api_url, DEFAULT_DEEPL_URL);
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let err = AppConfig::from_toml_str("[llm\nmodel=").unwrap_err();
        assert_eq!(err.code(), "serialization");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DEEPSEEK_API_KEY", "ds-key"),
            ("ABIA_LLM_API_KEY", "abia-key"),
            ("DEEPL_API_KEY", "  "),
            ("ABIA_PYTHON", "/usr/bin/python3.12"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key, "abia-key");
        assert!(config.translation.api_key.is_empty());
        assert_eq!(config.python.interpreter, "/usr/bin/python3.12");
    }
}
