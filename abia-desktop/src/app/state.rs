use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use abia_application::{AssistantUseCase, TaskScheduler};
use abia_core::config::AppConfig;
use abia_core::error::{AbiaError, Result};
use abia_core::integration::IntegrationService;
use abia_core::plugin::PluginRegistry;
use abia_core::session::SessionManager;
use abia_core::state::StateRepository;
use abia_core::usage::TokenStatsRepository;
use abia_infrastructure::{AbiaPaths, VectorStore};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::app::bootstrap::{BootstrapOptions, bootstrap};

/// Everything the commands need, built once by [`AppState::ensure_initialized`].
pub struct Services {
    pub config: AppConfig,
    pub paths: AbiaPaths,
    pub sessions: Arc<SessionManager>,
    pub state_repository: Arc<dyn StateRepository>,
    pub token_stats: Arc<dyn TokenStatsRepository>,
    pub vector_store: Arc<VectorStore>,
    pub integration: Arc<dyn IntegrationService>,
    pub assistant: Arc<AssistantUseCase>,
    pub plugins: Arc<PluginRegistry>,
    pub scheduler: Arc<TaskScheduler>,
    pub translations: TranslationJobs,
}

impl Services {
    /// Stops scheduled jobs and writes pending memory to disk.
    pub async fn shutdown(&self) {
        self.translations.cancel_all();
        self.scheduler.shutdown().await;
        match self.vector_store.flush().await {
            Ok(true) => tracing::info!("[Shutdown] Memory snapshot written"),
            Ok(false) => {}
            Err(e) => tracing::error!("[Shutdown] Failed to write memory snapshot: {}", e),
        }
    }
}

/// Cancellation tokens of running document translations, keyed by request id.
#[derive(Default)]
pub struct TranslationJobs {
    jobs: Mutex<HashMap<u64, CancellationToken>>,
}

impl TranslationJobs {
    fn jobs(&self) -> MutexGuard<'_, HashMap<u64, CancellationToken>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a job and returns the token its translation loop watches.
    pub fn start(&self, request_id: u64) -> CancellationToken {
        let token = CancellationToken::new();
        self.jobs().insert(request_id, token.clone());
        token
    }

    pub fn finish(&self, request_id: u64) {
        self.jobs().remove(&request_id);
    }

    /// Cancels a running job. Returns whether one was found.
    pub fn cancel(&self, request_id: u64) -> bool {
        match self.jobs().remove(&request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, token) in self.jobs().drain() {
            token.cancel();
        }
    }
}

/// Application state shared across IPC requests.
#[derive(Default)]
pub struct AppState {
    services: OnceCell<Arc<Services>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the services on first call; later calls return the same instance.
    ///
    /// Concurrent callers wait for the first initialization instead of
    /// starting their own. A failed initialization leaves the state
    /// uninitialized.
    pub async fn ensure_initialized(&self, options: BootstrapOptions) -> Result<Arc<Services>> {
        self.services
            .get_or_try_init(|| async move { bootstrap(options).await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The initialized services.
    ///
    /// # Errors
    ///
    /// [`AbiaError::NotInitialized`] before [`ensure_initialized`](Self::ensure_initialized) succeeded.
    pub fn services(&self) -> Result<Arc<Services>> {
        self.services.get().cloned().ok_or(AbiaError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.services.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_before_init() {
        let state = AppState::new();
        assert!(matches!(state.services(), Err(AbiaError::NotInitialized)));
        assert!(!state.is_initialized());
    }

    #[test]
    fn test_translation_jobs() {
        let jobs = TranslationJobs::default();
        let token = jobs.start(7);
        assert!(!jobs.cancel(8));
        assert!(jobs.cancel(7));
        assert!(token.is_cancelled());
        assert!(!jobs.cancel(7));

        let token = jobs.start(9);
        jobs.finish(9);
        assert!(!jobs.cancel(9));
        assert!(!token.is_cancelled());
    }
}
