use abia_core::integration::{TranslationProgress, TranslationRequest};
use serde_json::{Value, json};
use tokio::sync::mpsc::unbounded_channel;

use super::{Args, CommandError, CommandResult};
use crate::app::AppState;
use crate::ipc::{EVENT_TRANSLATION_PROGRESS, EventSink};

fn failure(context: &str, error: CommandError) -> Value {
    tracing::warn!("[Translation] {}: {}", context, error.message);
    json!({ "success": false, "error": error.message })
}

pub async fn translate_text(state: &AppState, args: &Args<'_>) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let text = args.required::<String>(0, "text")?;
        let target = args.required::<String>(1, "targetLang")?;
        let source = args.optional::<String>(2, "sourceLang")?;
        Ok::<_, CommandError>(
            services
                .assistant
                .translate_text(&text, &target, source.as_deref())
                .await?,
        )
    }
    .await;

    Ok(match outcome {
        Ok(translation) => json!({
            "success": true,
            "translatedText": translation.translated_text,
            "detectedSourceLanguage": translation.detected_source_language,
        }),
        Err(e) => failure("Text translation failed", e),
    })
}

/// Translates a document, streaming `translation-progress` events tagged
/// with the request id until the result is known.
pub async fn translate_document(
    state: &AppState,
    request_id: u64,
    args: &Args<'_>,
    events: &EventSink,
) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let request = TranslationRequest {
            file_path: args.required(0, "filePath")?,
            target_lang: args.required(1, "targetLang")?,
            source_lang: args.optional(2, "sourceLang")?,
        };

        let (tx, mut rx) = unbounded_channel::<TranslationProgress>();
        let sink = events.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                sink.emit(
                    EVENT_TRANSLATION_PROGRESS,
                    json!({
                        "requestId": request_id,
                        "step": progress.step,
                        "progress": progress.progress,
                    }),
                );
            }
        });

        let cancel = services.translations.start(request_id);
        let result = services
            .assistant
            .translate_document(&request, Some(tx), cancel)
            .await;
        services.translations.finish(request_id);
        if let Err(e) = forwarder.await {
            tracing::warn!("[Translation] Progress forwarding stopped: {}", e);
        }
        Ok::<_, CommandError>(result?)
    }
    .await;

    Ok(match outcome {
        Ok(done) => {
            tracing::info!("[Translation] Wrote {}", done.output_path);
            json!({
                "success": true,
                "outputPath": done.output_path,
                "fileName": done.file_name,
            })
        }
        Err(e) => failure("Document translation failed", e),
    })
}

/// Cancels the document translation started by request `requestId`.
pub async fn cancel_translation(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let request_id = args.required::<u64>(0, "requestId")?;
    let cancelled = services.translations.cancel(request_id);
    if cancelled {
        tracing::info!("[Translation] Cancelled request #{}", request_id);
    }
    Ok(json!(cancelled))
}

pub async fn get_supported_languages(state: &AppState) -> CommandResult {
    let services = state.services()?;
    Ok(serde_json::to_value(
        services.integration.supported_languages(),
    )?)
}

pub async fn get_supported_file_types(state: &AppState) -> CommandResult {
    let services = state.services()?;
    Ok(json!(services.integration.supported_file_types()))
}
