//! Agent routing contract.
//!
//! The application layer talks to agents only through [`IntegrationService`].
//! Implementations live in the interaction crate; tests substitute mocks.

use crate::error::Result;
use crate::session::{AgentKind, FileRef, Turn};
use crate::usage::TokenUsage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Options accompanying a free-form query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryOptions {
    /// Let the keyword classifier pick the agent instead of the active one.
    pub auto_route: bool,
    /// Re-run the classifier instead of reusing a cached routing decision.
    pub skip_cache: bool,
}

/// What an agent sees of the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub session_id: String,
    pub active_agent: AgentKind,
    pub active_files: Vec<FileRef>,
    /// Most recent turns, oldest first.
    pub history: Vec<Turn>,
}

impl AgentContext {
    /// The file the user most recently attached.
    pub fn active_file(&self) -> Option<&FileRef> {
        self.active_files.last()
    }
}

/// Category of an agent reply, used by the UI to pick a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReplyKind {
    General,
    Excel,
    Document,
    Filesystem,
    Letter,
    Translation,
}

/// A follow-up the UI can offer as a button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyAction {
    pub label: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ReplyAction {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
            payload: None,
        }
    }
}

/// Successful answer from an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    pub message: String,
    #[serde(default)]
    pub actions: Vec<ReplyAction>,
    pub agent: AgentKind,
    /// File produced by the agent, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Raw structured data (sheet summaries, extracted metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AgentReply {
    pub fn new(kind: ReplyKind, agent: AgentKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            actions: Vec::new(),
            agent,
            file: None,
            usage: None,
            data: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<ReplyAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_file(mut self, file: FileRef) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Rendered letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterOutput {
    pub template: String,
    pub title: String,
    pub content: String,
}

/// Title and fields of a letter template, as listed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterTemplateInfo {
    pub title: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub file_path: String,
    pub target_lang: String,
    /// `None` or `"auto"` lets the provider detect the language.
    #[serde(default)]
    pub source_lang: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TranslationStep {
    Upload,
    Translation,
    Download,
    Complete,
}

/// Progress notification for a document translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationProgress {
    pub step: TranslationStep,
    /// Percentage, 0..=100.
    pub progress: u8,
}

impl TranslationProgress {
    pub fn new(step: TranslationStep, progress: u8) -> Self {
        Self { step, progress }
    }
}

pub type ProgressSender = UnboundedSender<TranslationProgress>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutcome {
    pub output_path: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTranslation {
    pub translated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub code: String,
    pub name: String,
}

impl LanguageOption {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedLanguages {
    pub source: Vec<LanguageOption>,
    pub target: Vec<LanguageOption>,
}

/// Routes requests to domain agents.
#[async_trait]
pub trait IntegrationService: Send + Sync {
    /// Answers a free-form query with the agent named in `ctx` (or the
    /// classifier's pick when `options.auto_route` is set).
    async fn process_query(
        &self,
        query: &str,
        options: &QueryOptions,
        ctx: &AgentContext,
    ) -> Result<AgentReply>;

    async fn process_excel_file(
        &self,
        path: &str,
        query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply>;

    async fn process_document(
        &self,
        path: &str,
        query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply>;

    async fn generate_letter(
        &self,
        template_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<LetterOutput>;

    fn letter_templates(&self) -> BTreeMap<String, LetterTemplateInfo>;

    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation>;

    /// Translates a document, reporting progress through `progress` until
    /// completion, failure, or `cancel` firing.
    async fn translate_document(
        &self,
        request: &TranslationRequest,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<TranslationOutcome>;

    fn supported_languages(&self) -> SupportedLanguages;

    fn supported_file_types(&self) -> Vec<String>;
}
