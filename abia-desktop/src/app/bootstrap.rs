use std::sync::Arc;
use std::time::Duration;

use abia_application::{AssistantUseCase, TaskScheduler, builtin_plugins};
use abia_core::config::AppConfig;
use abia_core::error::{AbiaError, Result};
use abia_core::integration::IntegrationService;
use abia_core::plugin::PluginRegistry;
use abia_core::session::SessionManager;
use abia_core::state::StateRepository;
use abia_core::usage::{DEFAULT_STATS_MODEL, TokenStatsRepository};
use abia_infrastructure::{
    AbiaPaths, AsyncDirSessionRepository, StateRepositoryImpl, TokenStatsStore, VectorStore,
};
use abia_interaction::AgentRouter;
use futures::FutureExt;

use crate::app::state::{Services, TranslationJobs};

pub const VECTOR_FLUSH_TASK: &str = "vector-store-flush";

/// Inputs of [`bootstrap`].
pub struct BootstrapOptions {
    pub config: AppConfig,
    pub paths: AbiaPaths,
    /// Replaces the agent router built from `config`.
    pub integration: Option<Arc<dyn IntegrationService>>,
}

impl BootstrapOptions {
    pub fn new(config: AppConfig, paths: AbiaPaths) -> Self {
        Self {
            config,
            paths,
            integration: None,
        }
    }

    pub fn with_integration(mut self, integration: Arc<dyn IntegrationService>) -> Self {
        self.integration = Some(integration);
        self
    }
}

/// Composition root: builds every service and brings the session up.
///
/// Restores the last active session (or creates one), loads the built-in
/// plugins and schedules the periodic memory flush.
pub async fn bootstrap(options: BootstrapOptions) -> Result<Services> {
    let BootstrapOptions {
        config,
        paths,
        integration,
    } = options;

    paths
        .ensure_dirs()
        .map_err(|e| AbiaError::io(format!("Failed to create data directories: {}", e)))?;
    tracing::info!("[Bootstrap] Data directory: {}", paths.base_dir().display());

    let session_repository = Arc::new(AsyncDirSessionRepository::new(&paths).await?);
    let state_repository: Arc<dyn StateRepository> = Arc::new(StateRepositoryImpl::new(&paths));
    let sessions = Arc::new(SessionManager::new(
        session_repository,
        state_repository.clone(),
    ));

    match sessions.restore_last_session().await {
        Ok(Some(session)) => {
            tracing::info!("[Bootstrap] Restored session {}", session.id);
        }
        Ok(None) => {
            let id = sessions.create_new_session().await?;
            tracing::info!("[Bootstrap] Started new session {}", id);
        }
        Err(e) => {
            tracing::warn!("[Bootstrap] Could not restore last session: {}", e);
            sessions.create_new_session().await?;
        }
    }

    let token_stats: Arc<dyn TokenStatsRepository> = Arc::new(TokenStatsStore::new(&paths));
    let vector_store = Arc::new(VectorStore::open(paths.vector_store_file()).await);

    let (integration, model_name) = match integration {
        Some(integration) => (integration, DEFAULT_STATS_MODEL.to_string()),
        None => {
            let router = AgentRouter::from_config(&config)
                .map_err(|e| AbiaError::config(format!("Failed to set up agents: {}", e)))?;
            let model = router
                .model_name()
                .unwrap_or_else(|| DEFAULT_STATS_MODEL.to_string());
            (Arc::new(router) as Arc<dyn IntegrationService>, model)
        }
    };

    let assistant = Arc::new(
        AssistantUseCase::new(
            sessions.clone(),
            integration.clone(),
            token_stats.clone(),
            vector_store.clone(),
        )
        .with_context_window(config.storage.context_window)
        .with_model_name(model_name),
    );

    let plugins = Arc::new(PluginRegistry::new());
    if config.plugins.enabled {
        let loaded = plugins.reload(builtin_plugins()).await;
        tracing::info!("[Bootstrap] Loaded {} plugin(s)", loaded);
    } else {
        tracing::info!("[Bootstrap] Plugins disabled");
    }

    let scheduler = Arc::new(TaskScheduler::new());
    schedule_vector_flush(&scheduler, &vector_store, config.tasks.vector_flush_secs)?;

    Ok(Services {
        config,
        paths,
        sessions,
        state_repository,
        token_stats,
        vector_store,
        integration,
        assistant,
        plugins,
        scheduler,
        translations: TranslationJobs::default(),
    })
}

fn schedule_vector_flush(
    scheduler: &TaskScheduler,
    store: &Arc<VectorStore>,
    period_secs: u64,
) -> Result<()> {
    if period_secs == 0 {
        tracing::info!("[Bootstrap] Periodic memory flush disabled");
        return Ok(());
    }
    let store = store.clone();
    scheduler.schedule_every(VECTOR_FLUSH_TASK, Duration::from_secs(period_secs), move || {
        let store = store.clone();
        async move {
            match store.flush().await {
                Ok(true) => tracing::debug!("[Tasks] Memory snapshot written"),
                Ok(false) => {}
                Err(e) => tracing::warn!("[Tasks] Memory flush failed: {}", e),
            }
        }
        .boxed()
    })
}
