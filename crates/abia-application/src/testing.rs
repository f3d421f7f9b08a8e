//! Shared fixtures for unit tests.

use crate::AssistantUseCase;
use abia_core::error::{AbiaError, Result};
use abia_core::integration::{
    AgentContext, AgentReply, IntegrationService, LetterOutput, LetterTemplateInfo,
    ProgressSender, QueryOptions, ReplyKind, SupportedLanguages, TextTranslation,
    TranslationOutcome, TranslationRequest,
};
use abia_core::session::{AgentKind, SessionManager, SessionRepository};
use abia_core::state::StateRepository;
use abia_core::usage::{TokenStats, TokenStatsRepository, TokenUsage};
use abia_infrastructure::{
    AsyncDirSessionRepository, StateRepositoryImpl, TokenStatsStore, VectorStore,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Answers every call with a canned reply, or fails every call.
#[derive(Default)]
pub struct MockIntegration {
    fail: bool,
    route_to: Option<AgentKind>,
    last_context: Mutex<Option<AgentContext>>,
    /// Queries that wait for their gate to open before answering.
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockIntegration {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn routing_to(agent: AgentKind) -> Self {
        Self {
            route_to: Some(agent),
            ..Self::default()
        }
    }

    /// Holds `query` until the returned gate is notified.
    pub fn gate(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Ok(mut gates) = self.gates.lock() {
            gates.insert(query.to_string(), gate.clone());
        }
        gate
    }

    pub fn last_context(&self) -> Option<AgentContext> {
        self.last_context.lock().ok().and_then(|c| c.clone())
    }

    fn observe(&self, ctx: &AgentContext, service: &str) -> Result<()> {
        if let Ok(mut last) = self.last_context.lock() {
            *last = Some(ctx.clone());
        }
        if self.fail {
            return Err(AbiaError::external(service, "service indisponible"));
        }
        Ok(())
    }
}

#[async_trait]
impl IntegrationService for MockIntegration {
    async fn process_query(
        &self,
        query: &str,
        options: &QueryOptions,
        ctx: &AgentContext,
    ) -> Result<AgentReply> {
        self.observe(ctx, ctx.active_agent.as_ref())?;
        let gate = self.gates.lock().ok().and_then(|g| g.get(query).cloned());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let agent = match (options.auto_route, self.route_to) {
            (true, Some(agent)) => agent,
            _ => ctx.active_agent,
        };
        Ok(
            AgentReply::new(ReplyKind::General, agent, format!("réponse à {}", query))
                .with_usage(Some(TokenUsage::new(10, 5))),
        )
    }

    async fn process_excel_file(
        &self,
        path: &str,
        _query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply> {
        self.observe(ctx, "excel")?;
        Ok(AgentReply::new(
            ReplyKind::Excel,
            AgentKind::Excel,
            format!("{} analysé", path),
        ))
    }

    async fn process_document(
        &self,
        path: &str,
        _query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply> {
        self.observe(ctx, "document")?;
        Ok(AgentReply::new(
            ReplyKind::Document,
            AgentKind::Document,
            format!("{} lu", path),
        ))
    }

    async fn generate_letter(
        &self,
        template_type: &str,
        _data: &BTreeMap<String, Value>,
    ) -> Result<LetterOutput> {
        if self.fail {
            return Err(AbiaError::external("mail", "service indisponible"));
        }
        Ok(LetterOutput {
            template: template_type.to_string(),
            title: "Lettre".to_string(),
            content: "Madame, Monsieur".to_string(),
        })
    }

    fn letter_templates(&self) -> BTreeMap<String, LetterTemplateInfo> {
        BTreeMap::new()
    }

    async fn translate_text(
        &self,
        text: &str,
        _target_lang: &str,
        _source_lang: Option<&str>,
    ) -> Result<TextTranslation> {
        if self.fail {
            return Err(AbiaError::external("translation", "service indisponible"));
        }
        Ok(TextTranslation {
            translated_text: text.to_uppercase(),
            detected_source_language: Some("FR".to_string()),
        })
    }

    async fn translate_document(
        &self,
        request: &TranslationRequest,
        _progress: Option<ProgressSender>,
        _cancel: CancellationToken,
    ) -> Result<TranslationOutcome> {
        if self.fail {
            return Err(AbiaError::external("translation", "service indisponible"));
        }
        Ok(TranslationOutcome {
            output_path: format!("/out/{}", request.target_lang),
            file_name: request.target_lang.clone(),
        })
    }

    fn supported_languages(&self) -> SupportedLanguages {
        SupportedLanguages {
            source: Vec::new(),
            target: Vec::new(),
        }
    }

    fn supported_file_types(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Token stats store whose writes always fail.
pub struct FailingTokenStats;

#[async_trait]
impl TokenStatsRepository for FailingTokenStats {
    async fn load(&self) -> Result<TokenStats> {
        Ok(TokenStats::default())
    }

    async fn record(&self, _usage: TokenUsage, _model: &str) -> Result<TokenStats> {
        Err(AbiaError::storage("disk full"))
    }
}

pub struct Harness {
    pub usecase: AssistantUseCase,
    pub sessions: Arc<SessionManager>,
    pub integration: Arc<MockIntegration>,
    pub token_stats: Arc<TokenStatsStore>,
    pub memory: Arc<VectorStore>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub state_repo: Arc<dyn StateRepository>,
    _dir: TempDir,
}

/// Builds a use case over file stores in a temp dir, with one open session.
pub async fn harness(integration: MockIntegration) -> Harness {
    let dir = TempDir::new().unwrap();
    let session_repo: Arc<dyn SessionRepository> = Arc::new(
        AsyncDirSessionRepository::with_dir(dir.path().join("sessions"))
            .await
            .unwrap(),
    );
    let state_repo: Arc<dyn StateRepository> =
        Arc::new(StateRepositoryImpl::with_file(dir.path().join("state.json")));
    let sessions = Arc::new(SessionManager::new(session_repo.clone(), state_repo.clone()));
    sessions.create_new_session().await.unwrap();

    let integration = Arc::new(integration);
    let token_stats = Arc::new(TokenStatsStore::with_file(
        dir.path().join("token_stats.json"),
    ));
    let memory = Arc::new(VectorStore::in_memory());
    let usecase = AssistantUseCase::new(
        sessions.clone(),
        integration.clone(),
        token_stats.clone(),
        memory.clone(),
    );

    Harness {
        usecase,
        sessions,
        integration,
        token_stats,
        memory,
        session_repo,
        state_repo,
        _dir: dir,
    }
}
