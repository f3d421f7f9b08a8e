//! Use case wired to the real router and file-backed stores.

use abia_application::AssistantUseCase;
use abia_core::integration::QueryOptions;
use abia_core::memory::{MemoryIndex, MemoryMetadata};
use abia_core::session::{AgentKind, SessionManager, TurnRole};
use abia_core::usage::{TokenStatsRepository, TokenUsage};
use abia_infrastructure::{
    AbiaPaths, AsyncDirSessionRepository, StateRepositoryImpl, TokenStatsStore, VectorStore,
};
use abia_interaction::{
    AgentError, AgentRouter, ChatMessage, Completion, DeepLTranslator, LlmClient, PollPolicy,
    Providers, PythonRunner,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

struct EchoLlm;

#[async_trait]
impl LlmClient for EchoLlm {
    fn model(&self) -> &str {
        "echo-model"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, AgentError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Completion {
            text: format!("Écho: {}", last),
            usage: TokenUsage::new(20, 7),
        })
    }
}

struct Fixture {
    usecase: AssistantUseCase,
    sessions: Arc<SessionManager>,
    stats: Arc<TokenStatsStore>,
    memory: Arc<VectorStore>,
    paths: AbiaPaths,
    _temp: TempDir,
}

async fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let paths = AbiaPaths::new(Some(&temp.path().join("data"))).unwrap();
    paths.ensure_dirs().unwrap();

    let sessions = Arc::new(SessionManager::new(
        Arc::new(AsyncDirSessionRepository::new(&paths).await.unwrap()),
        Arc::new(StateRepositoryImpl::new(&paths)),
    ));
    sessions.create_new_session().await.unwrap();

    let router = AgentRouter::new(Providers {
        llm: Some(Arc::new(EchoLlm)),
        translator: Arc::new(DeepLTranslator::new("", "http://127.0.0.1:9")),
        python: PythonRunner::new("python3", temp.path().join("scripts")),
        poll_policy: PollPolicy::default(),
        translations_dir: temp.path().join("ABIA_Traductions"),
        filesystem_root: temp.path().join("files"),
    })
    .unwrap();

    let stats = Arc::new(TokenStatsStore::new(&paths));
    let memory = Arc::new(VectorStore::open(paths.vector_store_file()).await);
    let usecase = AssistantUseCase::new(
        sessions.clone(),
        Arc::new(router),
        stats.clone(),
        memory.clone(),
    )
    .with_model_name("echo-model");

    Fixture {
        usecase,
        sessions,
        stats,
        memory,
        paths,
        _temp: temp,
    }
}

#[tokio::test]
async fn chat_exchange_is_persisted_counted_and_indexed() {
    let f = fixture().await;
    let reply = f
        .usecase
        .process_query("Quelle est la capitale de la France ?", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(reply.message, "Écho: Quelle est la capitale de la France ?");

    let stats = f.stats.load().await.unwrap();
    assert_eq!(stats.total, 27);
    assert_eq!(stats.model, "echo-model");

    let session_id = f.sessions.current_id().await.unwrap();
    let filter: MemoryMetadata = [("sessionId".to_string(), json!(session_id))]
        .into_iter()
        .collect();
    let hits = f
        .memory
        .search("capitale France", 3, Some(&filter))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].document.content.contains("capitale"));

    assert!(f.memory.flush().await.unwrap());
    assert!(f.paths.vector_store_file().exists());

    // A fresh manager over the same directory sees the recorded turns.
    let reopened = SessionManager::new(
        Arc::new(AsyncDirSessionRepository::new(&f.paths).await.unwrap()),
        Arc::new(StateRepositoryImpl::new(&f.paths)),
    );
    let restored = reopened.restore_last_session().await.unwrap().unwrap();
    assert_eq!(restored.history.len(), 2);
    assert_eq!(restored.history[1].role, TurnRole::Assistant);
}

#[tokio::test]
async fn letter_switches_agent_and_skips_token_stats() {
    let f = fixture().await;
    let mut data = BTreeMap::new();
    data.insert("objet".to_string(), json!("Résiliation de contrat"));
    data.insert("signature".to_string(), json!("Jeanne Martin"));

    let letter = f.usecase.generate_letter("resiliation", &data).await.unwrap();
    assert!(letter.content.contains("Jeanne Martin"));

    assert_eq!(f.sessions.active_agent().await.unwrap(), AgentKind::Mail);
    let history = f.sessions.conversation_history(None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].agent, Some(AgentKind::Mail));
    assert_eq!(f.stats.load().await.unwrap().total, 0);
}

#[tokio::test]
async fn unknown_letter_template_records_nothing() {
    let f = fixture().await;
    let err = f
        .usecase
        .generate_letter("inconnu", &BTreeMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "external_service");
    assert!(err.user_message().contains("inconnu"));
    assert!(f.sessions.conversation_history(None).await.unwrap().is_empty());
    assert!(f.memory.is_empty().await);
}

#[tokio::test]
async fn text_translation_without_key_fails_cleanly() {
    let f = fixture().await;
    let err = f
        .usecase
        .translate_text("Bonjour", "EN-US", None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "external_service");
    assert!(f.sessions.conversation_history(None).await.unwrap().is_empty());
}
