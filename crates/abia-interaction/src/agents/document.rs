//! Document reading and question answering.

use super::chat::{ChatAgent, system_prompt};
use super::{ensure_exists, truncate_chars};
use crate::error::AgentError;
use crate::llm_client::ChatMessage;
use crate::python_runner::{DOCUMENT_SCRIPT, PythonRunner};
use abia_core::integration::{AgentContext, AgentReply, ReplyKind};
use abia_core::session::{AgentKind, FILE_TYPE_TEXT, FileRef};
use serde_json::{Value, json};

pub const DEFAULT_DOCUMENT_QUERY: &str = "Analyser ce document";

const MAX_PROMPT_CHARS: usize = 12_000;
const EXCERPT_CHARS: usize = 500;

/// Text and metadata pulled out of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub metadata: Value,
}

impl Extraction {
    fn from_script(value: Value) -> Self {
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata = value.get("metadata").cloned().unwrap_or(Value::Null);
        Self { text, metadata }
    }
}

pub fn describe_document(file: &FileRef, extraction: &Extraction) -> String {
    let mut summary = format!("# Document {}\n\n- Type: {}\n", file.name, file.file_type);
    for (key, label) in [("title", "Titre"), ("author", "Auteur"), ("subject", "Sujet")] {
        if let Some(value) = extraction.metadata.get(key).and_then(Value::as_str)
            && !value.trim().is_empty()
        {
            summary.push_str(&format!("- {}: {}\n", label, value));
        }
    }
    summary.push_str(&format!(
        "- Longueur: {} caractères\n",
        extraction.text.chars().count()
    ));

    let excerpt = truncate_chars(extraction.text.trim(), EXCERPT_CHARS);
    if !excerpt.is_empty() {
        summary.push_str(&format!("\n{}", excerpt));
        if excerpt.len() < extraction.text.trim().len() {
            summary.push('…');
        }
    }
    summary
}

#[derive(Clone)]
pub struct DocumentAgent {
    runner: PythonRunner,
    chat: ChatAgent,
}

impl DocumentAgent {
    pub fn new(runner: PythonRunner, chat: ChatAgent) -> Self {
        Self { runner, chat }
    }

    /// Plain text is read directly; other formats go through the extractor script.
    pub async fn extract(&self, file: &FileRef) -> Result<Extraction, AgentError> {
        if file.file_type == FILE_TYPE_TEXT {
            let text = tokio::fs::read_to_string(&file.path).await?;
            return Ok(Extraction {
                text,
                metadata: Value::Null,
            });
        }
        let value = self
            .runner
            .run_json(DOCUMENT_SCRIPT, [file.path.as_str()])
            .await?;
        Ok(Extraction::from_script(value))
    }

    pub async fn analyze(
        &self,
        path: &str,
        query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply, AgentError> {
        ensure_exists(path).await?;
        let query = if query.trim().is_empty() {
            DEFAULT_DOCUMENT_QUERY
        } else {
            query
        };

        let file = FileRef::new(path);
        let extraction = self.extract(&file).await?;
        tracing::info!(
            "[DocumentAgent] Extracted {} chars from {} for session {}",
            extraction.text.len(),
            file.name,
            ctx.session_id
        );

        let overview = describe_document(&file, &extraction);
        let (message, usage) = if self.chat.llm().is_some() {
            let messages = [
                ChatMessage::system(system_prompt(Some(&file))),
                ChatMessage::user(format!(
                    "{}\n\nContenu du document {}:\n{}",
                    query,
                    file.name,
                    truncate_chars(&extraction.text, MAX_PROMPT_CHARS)
                )),
            ];
            let completion = self.chat.complete(&messages).await?;
            (completion.text, Some(completion.usage))
        } else {
            (overview, None)
        };

        let data = json!({
            "fileType": file.file_type,
            "metadata": extraction.metadata,
            "length": extraction.text.chars().count(),
        });
        Ok(
            AgentReply::new(ReplyKind::Document, AgentKind::Document, message)
                .with_usage(usage)
                .with_data(data),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{ScriptedLlm, context};
    use std::sync::Arc;

    #[test]
    fn test_describe_document() {
        let file = FileRef::new("/docs/contrat.pdf");
        let extraction = Extraction {
            text: "Article 1. Objet du contrat".into(),
            metadata: json!({"title": "Contrat", "author": ""}),
        };
        let summary = describe_document(&file, &extraction);
        assert!(summary.contains("- Type: pdf"));
        assert!(summary.contains("- Titre: Contrat"));
        assert!(!summary.contains("Auteur"));
        assert!(summary.contains("Article 1."));
    }

    #[tokio::test]
    async fn test_text_file_without_llm() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("notes.md");
        std::fs::write(&path, "Réunion lundi à 10h").unwrap();
        let path = path.to_string_lossy().into_owned();

        let agent = DocumentAgent::new(
            PythonRunner::new("abia-no-such-interpreter", "python"),
            ChatAgent::new(None),
        );
        let reply = agent
            .analyze(&path, "", &context(AgentKind::Document))
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Document);
        assert!(reply.message.contains("Réunion lundi"));
        assert_eq!(reply.data.as_ref().unwrap()["fileType"], "text");
        assert!(reply.usage.is_none());
    }

    #[tokio::test]
    async fn test_question_goes_to_llm() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "Le loyer est de 800 euros.").unwrap();
        let path = path.to_string_lossy().into_owned();

        let llm = Arc::new(ScriptedLlm::new("800 euros."));
        let agent = DocumentAgent::new(
            PythonRunner::new("python3", "python"),
            ChatAgent::new(Some(llm.clone())),
        );
        let reply = agent
            .analyze(&path, "Quel est le loyer ?", &context(AgentKind::Document))
            .await
            .unwrap();
        assert_eq!(reply.message, "800 euros.");
        let prompt = &llm.last_messages()[1].content;
        assert!(prompt.starts_with("Quel est le loyer ?"));
        assert!(prompt.contains("800 euros"));
    }
}
