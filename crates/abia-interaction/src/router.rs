//! Dispatches integration calls to the domain agents.

use crate::agents::excel::is_excel_file;
use crate::agents::translation::PollPolicy;
use crate::agents::{
    ChatAgent, DocumentAgent, ExcelAgent, FilesystemAgent, MailAgent, TranslationAgent,
};
use crate::classifier::ClassificationCache;
use crate::error::AgentError;
use crate::llm_client::{LlmClient, OpenAiCompatClient};
use crate::python_runner::PythonRunner;
use crate::translator::{DeepLTranslator, DocumentTranslator};
use abia_core::config::AppConfig;
use abia_core::error::Result;
use abia_core::integration::{
    AgentContext, AgentReply, IntegrationService, LetterOutput, LetterTemplateInfo,
    ProgressSender, QueryOptions, ReplyKind, SupportedLanguages, TextTranslation,
    TranslationOutcome, TranslationRequest,
};
use abia_core::session::{AgentKind, FILE_TYPE_EXCEL};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// External collaborators the agents are built on.
pub struct Providers {
    pub llm: Option<Arc<dyn LlmClient>>,
    pub translator: Arc<dyn DocumentTranslator>,
    pub python: PythonRunner,
    pub poll_policy: PollPolicy,
    pub translations_dir: PathBuf,
    pub filesystem_root: PathBuf,
}

impl Providers {
    /// Builds the HTTP and subprocess providers from configuration.
    ///
    /// A missing LLM key is not an error: chat answers then fail with a
    /// provider error while letters, filesystem answers and raw extraction
    /// keep working.
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, AgentError> {
        let llm: Option<Arc<dyn LlmClient>> = match OpenAiCompatClient::from_config(&config.llm) {
            Ok(client) => Some(Arc::new(client)),
            Err(AgentError::NotConfigured(reason)) => {
                tracing::warn!("[Router] LLM disabled: {}", reason);
                None
            }
            Err(e) => return Err(e),
        };

        let translator = DeepLTranslator::from_config(
            &config.translation,
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        let translations_dir =
            abia_infrastructure::translations_dir(config.translation.output_dir.as_deref())
                .map_err(|e| AgentError::NotConfigured(e.to_string()))?;
        let filesystem_root = FilesystemAgent::default_base_dir().ok_or_else(|| {
            AgentError::NotConfigured("Could not determine the documents directory".into())
        })?;

        Ok(Self {
            llm,
            translator: Arc::new(translator),
            python: PythonRunner::from_config(&config.python),
            poll_policy: PollPolicy::from_config(&config.translation),
            translations_dir,
            filesystem_root,
        })
    }
}

pub struct AgentRouter {
    chat: ChatAgent,
    excel: ExcelAgent,
    document: DocumentAgent,
    filesystem: FilesystemAgent,
    mail: MailAgent,
    translation: TranslationAgent,
    classifications: ClassificationCache,
}

impl AgentRouter {
    pub fn new(providers: Providers) -> std::result::Result<Self, AgentError> {
        let chat = ChatAgent::new(providers.llm);
        Ok(Self {
            excel: ExcelAgent::new(providers.python.clone(), chat.clone()),
            document: DocumentAgent::new(providers.python, chat.clone()),
            filesystem: FilesystemAgent::new(providers.filesystem_root),
            mail: MailAgent::new()?,
            translation: TranslationAgent::new(
                providers.translator,
                providers.poll_policy,
                providers.translations_dir,
            ),
            classifications: ClassificationCache::default(),
            chat,
        })
    }

    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, AgentError> {
        Self::new(Providers::from_config(config)?)
    }

    /// Model name charged in token statistics, when a model is configured.
    pub fn model_name(&self) -> Option<String> {
        self.chat.llm().map(|llm| llm.model().to_string())
    }

    /// Agent a query goes to.
    pub fn route(&self, query: &str, options: &QueryOptions, ctx: &AgentContext) -> AgentKind {
        if !options.auto_route {
            return ctx.active_agent;
        }
        let classification = self.classifications.classify(query, options.skip_cache);
        tracing::debug!(
            "[Router] Classified as {} (confidence {:.1})",
            classification.agent,
            classification.confidence
        );
        classification.agent
    }

    async fn dispatch(
        &self,
        agent: AgentKind,
        query: &str,
        ctx: &AgentContext,
    ) -> std::result::Result<AgentReply, AgentError> {
        match agent {
            AgentKind::Chat => self.chat.answer(query, ctx).await,
            AgentKind::Excel => match ctx.active_file().filter(|f| is_excel_file(&f.path)) {
                Some(file) => self.excel.analyze(&file.path, query, ctx).await,
                None => Ok(AgentReply::new(
                    ReplyKind::Excel,
                    AgentKind::Excel,
                    "Pour analyser un fichier Excel, veuillez fournir un fichier.",
                )),
            },
            AgentKind::Document => match ctx.active_file().filter(|f| f.file_type != FILE_TYPE_EXCEL) {
                Some(file) => self.document.analyze(&file.path, query, ctx).await,
                None => Ok(AgentReply::new(
                    ReplyKind::Document,
                    AgentKind::Document,
                    "Pour analyser un document, veuillez fournir un fichier.",
                )),
            },
            AgentKind::Filesystem => self.filesystem.answer(query, ctx).await,
            AgentKind::Mail => Ok(self.mail.answer(query, ctx)),
            AgentKind::Translation => Ok(self.translation.answer(query, ctx)),
        }
    }
}

#[async_trait]
impl IntegrationService for AgentRouter {
    async fn process_query(
        &self,
        query: &str,
        options: &QueryOptions,
        ctx: &AgentContext,
    ) -> Result<AgentReply> {
        let agent = self.route(query, options, ctx);
        tracing::info!(
            "[Router] Query for session {} handled by {}",
            ctx.session_id,
            agent
        );
        self.dispatch(agent, query, ctx)
            .await
            .map_err(|e| e.into_external(agent.as_ref()))
    }

    async fn process_excel_file(
        &self,
        path: &str,
        query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply> {
        self.excel
            .analyze(path, query, ctx)
            .await
            .map_err(|e| e.into_external("excel"))
    }

    async fn process_document(
        &self,
        path: &str,
        query: &str,
        ctx: &AgentContext,
    ) -> Result<AgentReply> {
        self.document
            .analyze(path, query, ctx)
            .await
            .map_err(|e| e.into_external("document"))
    }

    async fn generate_letter(
        &self,
        template_type: &str,
        data: &BTreeMap<String, Value>,
    ) -> Result<LetterOutput> {
        self.mail
            .generate(template_type, data)
            .map_err(|e| e.into_external("mail"))
    }

    fn letter_templates(&self) -> BTreeMap<String, LetterTemplateInfo> {
        self.mail.available_templates()
    }

    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation> {
        self.translation
            .translate_text(text, target_lang, source_lang)
            .await
            .map_err(|e| e.into_external("translation"))
    }

    async fn translate_document(
        &self,
        request: &TranslationRequest,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<TranslationOutcome> {
        self.translation
            .translate_document(request, progress, cancel)
            .await
            .map_err(|e| e.into_external("translation"))
    }

    fn supported_languages(&self) -> SupportedLanguages {
        self.translation.supported_languages()
    }

    fn supported_file_types(&self) -> Vec<String> {
        self.translation.supported_file_types()
    }
}
