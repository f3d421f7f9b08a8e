//! Assistant use case.
//!
//! `AssistantUseCase` sits between the IPC commands and the agents. For
//! every domain request it:
//!
//! 1. selects the matching agent and attaches the input file,
//! 2. builds the [`AgentContext`] from the current session,
//! 3. calls the [`IntegrationService`],
//! 4. on success only, records the user and assistant turns, charges the
//!    token usage and indexes the exchange into memory.
//!
//! A failed call leaves the history untouched. Once the turns are stored,
//! token accounting and memory indexing only log their failures.

use abia_core::error::Result;
use abia_core::integration::{
    AgentContext, AgentReply, IntegrationService, LetterOutput, ProgressSender, QueryOptions,
    TextTranslation, TranslationOutcome, TranslationRequest,
};
use abia_core::memory::{MemoryIndex, MemoryMetadata};
use abia_core::session::{AgentKind, FileRef, SessionManager, Turn};
use abia_core::usage::{DEFAULT_STATS_MODEL, TokenStatsRepository, TokenUsage};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// What gets written back after a successful agent call.
struct Exchange {
    session_id: String,
    user: Turn,
    assistant: Turn,
    usage: Option<TokenUsage>,
}

pub struct AssistantUseCase {
    sessions: Arc<SessionManager>,
    integration: Arc<dyn IntegrationService>,
    token_stats: Arc<dyn TokenStatsRepository>,
    memory: Arc<dyn MemoryIndex>,
    /// Number of recent turns handed to agents.
    context_window: usize,
    /// Model name charged in token statistics.
    model_name: String,
}

impl AssistantUseCase {
    pub fn new(
        sessions: Arc<SessionManager>,
        integration: Arc<dyn IntegrationService>,
        token_stats: Arc<dyn TokenStatsRepository>,
        memory: Arc<dyn MemoryIndex>,
    ) -> Self {
        Self {
            sessions,
            integration,
            token_stats,
            memory,
            context_window: DEFAULT_CONTEXT_WINDOW,
            model_name: DEFAULT_STATS_MODEL.to_string(),
        }
    }

    pub fn with_context_window(mut self, turns: usize) -> Self {
        self.context_window = turns;
        self
    }

    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn integration(&self) -> &Arc<dyn IntegrationService> {
        &self.integration
    }

    pub fn memory(&self) -> &Arc<dyn MemoryIndex> {
        &self.memory
    }

    /// Snapshot of the current session as agents see it.
    pub async fn agent_context(&self) -> Result<AgentContext> {
        let session = self.sessions.current_context().await?;
        Ok(AgentContext {
            history: session.recent_turns(Some(self.context_window)),
            session_id: session.id,
            active_agent: session.active_agent,
            active_files: session.active_files,
        })
    }

    /// Answers a free-form query with the active agent.
    pub async fn process_query(&self, query: &str, options: &QueryOptions) -> Result<AgentReply> {
        let ctx = self.agent_context().await?;
        let reply = self.integration.process_query(query, options, &ctx).await?;

        if options.auto_route && reply.agent != ctx.active_agent {
            // The routed agent becomes the active one for follow-ups.
            if let Err(e) = self.sessions.set_active_agent_kind(reply.agent).await {
                tracing::warn!("[Assistant] Could not switch to {}: {}", reply.agent, e);
            }
        }

        self.record(Exchange {
            user: Turn::user(query)
                .with_agent(reply.agent)
                .with_file(ctx.active_file().cloned()),
            assistant: Turn::assistant(reply.message.clone(), reply.agent)
                .with_file(reply.file.clone()),
            usage: reply.usage,
            session_id: ctx.session_id,
        })
        .await?;
        Ok(reply)
    }

    pub async fn process_excel_file(&self, path: &str, query: &str) -> Result<AgentReply> {
        let file = self.prepare(AgentKind::Excel, Some(path)).await?;
        let ctx = self.agent_context().await?;
        let reply = self
            .integration
            .process_excel_file(path, query, &ctx)
            .await?;
        self.record_file_reply(ctx, query, file, &reply).await?;
        Ok(reply)
    }

    pub async fn process_document(&self, path: &str, query: &str) -> Result<AgentReply> {
        let file = self.prepare(AgentKind::Document, Some(path)).await?;
        let ctx = self.agent_context().await?;
        let reply = self.integration.process_document(path, query, &ctx).await?;
        self.record_file_reply(ctx, query, file, &reply).await?;
        Ok(reply)
    }

    pub async fn generate_letter(
        &self,
        template_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<LetterOutput> {
        self.prepare(AgentKind::Mail, None).await?;
        let session_id = self.current_session_id().await?;
        let letter = self.integration.generate_letter(template_type, data).await?;

        self.record(Exchange {
            session_id,
            user: Turn::user(format!("Rédiger une lettre: {}", letter.title))
                .with_agent(AgentKind::Mail),
            assistant: Turn::assistant(letter.content.clone(), AgentKind::Mail),
            usage: None,
        })
        .await?;
        Ok(letter)
    }

    pub async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation> {
        self.prepare(AgentKind::Translation, None).await?;
        let session_id = self.current_session_id().await?;
        let translation = self
            .integration
            .translate_text(text, target_lang, source_lang)
            .await?;

        self.record(Exchange {
            session_id,
            user: Turn::user(text).with_agent(AgentKind::Translation),
            assistant: Turn::assistant(
                translation.translated_text.clone(),
                AgentKind::Translation,
            ),
            usage: None,
        })
        .await?;
        Ok(translation)
    }

    pub async fn translate_document(
        &self,
        request: &TranslationRequest,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<TranslationOutcome> {
        let file = self
            .prepare(AgentKind::Translation, Some(&request.file_path))
            .await?;
        let session_id = self.current_session_id().await?;
        let outcome = self
            .integration
            .translate_document(request, progress, cancel)
            .await?;

        let produced = FileRef::stat(outcome.output_path.clone()).await.generated();
        let user_text = format!(
            "Traduire {} en {}",
            file.as_ref().map(|f| f.name.as_str()).unwrap_or("le document"),
            request.target_lang
        );
        self.record(Exchange {
            session_id,
            user: Turn::user(user_text)
                .with_agent(AgentKind::Translation)
                .with_file(file),
            assistant: Turn::assistant(
                format!("Traduction terminée: {}", outcome.file_name),
                AgentKind::Translation,
            )
            .with_file(Some(produced)),
            usage: None,
        })
        .await?;
        Ok(outcome)
    }

    /// Selects `agent` and attaches `path` before a domain call.
    async fn prepare(&self, agent: AgentKind, path: Option<&str>) -> Result<Option<FileRef>> {
        self.sessions.set_active_agent_kind(agent).await?;
        let Some(path) = path else {
            return Ok(None);
        };
        let file = FileRef::stat(path).await;
        self.sessions.add_active_file(file.clone()).await?;
        Ok(Some(file))
    }

    async fn current_session_id(&self) -> Result<String> {
        Ok(self.sessions.current_context().await?.id)
    }

    async fn record_file_reply(
        &self,
        ctx: AgentContext,
        query: &str,
        file: Option<FileRef>,
        reply: &AgentReply,
    ) -> Result<()> {
        let user_text = match (query.trim(), &file) {
            ("", Some(file)) => format!("Analyser {}", file.name),
            (query, _) => query.to_string(),
        };
        self.record(Exchange {
            session_id: ctx.session_id,
            user: Turn::user(user_text)
                .with_agent(reply.agent)
                .with_file(file),
            assistant: Turn::assistant(reply.message.clone(), reply.agent)
                .with_file(reply.file.clone()),
            usage: reply.usage,
        })
        .await
    }

    async fn record(&self, exchange: Exchange) -> Result<()> {
        let memory_text = format!(
            "Q: {}\nR: {}",
            exchange.user.content, exchange.assistant.content
        );
        let agent = exchange.assistant.agent.unwrap_or_default();
        let session_id = exchange.session_id;

        self.sessions
            .record_exchange(&session_id, vec![exchange.user, exchange.assistant])
            .await?;

        if let Some(usage) = exchange.usage
            && usage.total() > 0
            && let Err(e) = self.token_stats.record(usage, &self.model_name).await
        {
            tracing::warn!("[Assistant] Failed to record token usage: {}", e);
        }

        let metadata: MemoryMetadata = [
            ("sessionId".to_string(), json!(session_id)),
            ("agent".to_string(), json!(agent)),
        ]
        .into_iter()
        .collect();
        if let Err(e) = self.memory.add(&memory_text, metadata).await {
            tracing::warn!("[Assistant] Failed to index exchange: {}", e);
        }
        Ok(())
    }
}
