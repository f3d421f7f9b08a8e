//! Domain agents behind the router.

pub mod chat;
pub mod document;
pub mod excel;
pub mod filesystem;
pub mod mail;
pub mod translation;

pub use chat::ChatAgent;
pub use document::DocumentAgent;
pub use excel::ExcelAgent;
pub use filesystem::FilesystemAgent;
pub use mail::MailAgent;
pub use translation::TranslationAgent;

use crate::error::AgentError;

/// Fails with the user-facing message when `path` does not exist.
pub(crate) async fn ensure_exists(path: &str) -> Result<(), AgentError> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => Ok(()),
        _ => Err(AgentError::ExecutionFailed(format!(
            "Le fichier {} n'existe pas.",
            path
        ))),
    }
}

/// Caps the amount of extracted content handed to the LLM.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::AgentError;
    use crate::llm_client::{ChatMessage, Completion, LlmClient};
    use abia_core::integration::AgentContext;
    use abia_core::session::AgentKind;
    use abia_core::usage::TokenUsage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// LLM double answering with a fixed text and keeping the last request.
    pub struct ScriptedLlm {
        answer: String,
        last: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedLlm {
        pub fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                last: Mutex::new(Vec::new()),
            }
        }

        pub fn last_messages(&self) -> Vec<ChatMessage> {
            self.last.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, AgentError> {
            *self.last.lock().unwrap() = messages.to_vec();
            Ok(Completion {
                text: self.answer.clone(),
                usage: TokenUsage::new(12, 4),
            })
        }
    }

    pub fn context(agent: AgentKind) -> AgentContext {
        AgentContext {
            session_id: "test-session".to_string(),
            active_agent: agent,
            active_files: Vec::new(),
            history: Vec::new(),
        }
    }
}
