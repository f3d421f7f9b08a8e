//! Document and text translation.
//!
//! A document translation reports progress as it goes: upload at 0%,
//! translation from 10% rising by 10 per status poll up to 90%, download
//! at 95% and completion at 100%. Polling is bounded by [`PollPolicy`] and
//! stops as soon as the cancellation token fires.

use super::ensure_exists;
use crate::error::AgentError;
use crate::translator::{
    DocumentHandle, DocumentStatus, DocumentTranslator, SUPPORTED_FILE_TYPES, default_languages,
};
use abia_core::config::TranslationConfig;
use abia_core::integration::{
    AgentContext, AgentReply, ProgressSender, ReplyAction, ReplyKind, SupportedLanguages,
    TextTranslation, TranslationOutcome, TranslationProgress, TranslationRequest,
    TranslationStep,
};
use abia_core::session::AgentKind;
use anyhow::Context;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TRANSLATION_START: u8 = 10;
const TRANSLATION_STEP: u8 = 10;
const TRANSLATION_MAX: u8 = 90;
const DOWNLOAD_PROGRESS: u8 = 95;
const COMPLETE_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts.max(1),
        }
    }
}

/// Extension with its dot, lowercased.
fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

/// `<stem>_<LANG><ext>`, keeping the original extension's case.
pub fn output_file_name(input: &Path, target_lang: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_{}{}", stem, target_lang.to_uppercase(), ext)
}

fn report(progress: &Option<ProgressSender>, step: TranslationStep, value: u8) {
    if let Some(tx) = progress {
        // The receiver may be gone if the UI stopped listening.
        let _ = tx.send(TranslationProgress::new(step, value));
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, AgentError>>,
) -> Result<T, AgentError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        result = fut => result,
    }
}

pub struct TranslationAgent {
    translator: Arc<dyn DocumentTranslator>,
    policy: PollPolicy,
    output_dir: PathBuf,
    languages: SupportedLanguages,
}

impl TranslationAgent {
    pub fn new(
        translator: Arc<dyn DocumentTranslator>,
        policy: PollPolicy,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            translator,
            policy,
            output_dir: output_dir.into(),
            languages: default_languages(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn supported_languages(&self) -> SupportedLanguages {
        self.languages.clone()
    }

    pub fn supported_file_types(&self) -> Vec<String> {
        SUPPORTED_FILE_TYPES.iter().map(|s| s.to_string()).collect()
    }

    pub fn is_supported(path: &Path) -> bool {
        SUPPORTED_FILE_TYPES.contains(&dotted_extension(path).as_str())
    }

    pub async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::ExecutionFailed(
                "Aucun texte à traduire".to_string(),
            ));
        }
        self.translator
            .translate_text(text, target_lang, source_lang)
            .await
    }

    pub async fn translate_document(
        &self,
        request: &TranslationRequest,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<TranslationOutcome, AgentError> {
        let input = Path::new(&request.file_path);
        ensure_exists(&request.file_path).await?;
        if !Self::is_supported(input) {
            return Err(AgentError::ExecutionFailed(format!(
                "Type de fichier non pris en charge: {}. Formats acceptés: {}",
                dotted_extension(input),
                SUPPORTED_FILE_TYPES.join(", ")
            )));
        }

        report(&progress, TranslationStep::Upload, 0);
        let handle = cancellable(
            &cancel,
            self.translator
                .upload(input, &request.target_lang, request.source_lang.as_deref()),
        )
        .await?;
        tracing::info!(
            "[Translation] Uploaded {} as {}",
            request.file_path,
            handle.document_id
        );

        report(&progress, TranslationStep::Translation, TRANSLATION_START);
        self.wait_until_done(&handle, &progress, &cancel).await?;

        report(&progress, TranslationStep::Download, DOWNLOAD_PROGRESS);
        let bytes = cancellable(&cancel, self.translator.download(&handle)).await?;

        let file_name = output_file_name(input, &request.target_lang);
        let output_path = self.output_dir.join(&file_name);
        self.write_output(&output_path, &bytes).await?;
        report(&progress, TranslationStep::Complete, COMPLETE_PROGRESS);

        tracing::info!("[Translation] Saved {}", output_path.display());
        Ok(TranslationOutcome {
            output_path: output_path.to_string_lossy().into_owned(),
            file_name,
        })
    }

    async fn wait_until_done(
        &self,
        handle: &DocumentHandle,
        progress: &Option<ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<(), AgentError> {
        for attempt in 1..=self.policy.max_attempts {
            match cancellable(cancel, self.translator.status(handle)).await? {
                DocumentStatus::Done => return Ok(()),
                DocumentStatus::Error(message) => {
                    return Err(AgentError::ExecutionFailed(format!(
                        "Erreur de traduction: {}",
                        message
                    )));
                }
                DocumentStatus::Queued | DocumentStatus::Translating { .. } => {
                    let step = u32::from(TRANSLATION_STEP).saturating_mul(attempt);
                    let value = u32::from(TRANSLATION_START)
                        .saturating_add(step)
                        .min(u32::from(TRANSLATION_MAX)) as u8;
                    report(progress, TranslationStep::Translation, value);
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        Err(AgentError::ExecutionFailed(format!(
            "La traduction n'a pas abouti après {} vérifications",
            self.policy.max_attempts
        )))
    }

    async fn write_output(&self, path: &Path, bytes: &[u8]) -> Result<(), AgentError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Free-form queries while the translation agent is active.
    pub fn answer(&self, _query: &str, ctx: &AgentContext) -> AgentReply {
        let translatable = ctx
            .active_file()
            .filter(|f| Self::is_supported(Path::new(&f.path)));

        match translatable {
            Some(file) => {
                let action = ReplyAction {
                    payload: Some(serde_json::json!({ "filePath": file.path })),
                    ..ReplyAction::new("Traduire le document", "translate-document")
                };
                AgentReply::new(
                    ReplyKind::Translation,
                    AgentKind::Translation,
                    format!(
                        "Je peux traduire {}. Choisissez la langue cible pour lancer la traduction.",
                        file.name
                    ),
                )
                .with_actions(vec![action])
            }
            None => AgentReply::new(
                ReplyKind::Translation,
                AgentKind::Translation,
                format!(
                    "Ajoutez un document à traduire ({}).",
                    SUPPORTED_FILE_TYPES.join(", ")
                ),
            ),
        }
    }
}
