//! Translation provider seam and the DeepL HTTP implementation.
//!
//! Document translation is a three-step protocol: upload the file, poll
//! its status until the provider reports `done`, then download the result.
//! The polling loop itself lives in the translation agent.

use crate::error::AgentError;
use abia_core::config::TranslationConfig;
use abia_core::integration::{LanguageOption, SupportedLanguages, TextTranslation};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const SUPPORTED_FILE_TYPES: &[&str] = &[".pdf", ".docx", ".pptx", ".txt"];

/// Auto-detection marker for the source language.
pub const AUTO_SOURCE: &str = "auto";

pub fn default_languages() -> SupportedLanguages {
    SupportedLanguages {
        source: vec![
            LanguageOption::new(AUTO_SOURCE, "Détection automatique"),
            LanguageOption::new("FR", "Français"),
            LanguageOption::new("EN", "Anglais"),
            LanguageOption::new("DE", "Allemand"),
            LanguageOption::new("ES", "Espagnol"),
            LanguageOption::new("IT", "Italien"),
        ],
        target: vec![
            LanguageOption::new("FR", "Français"),
            LanguageOption::new("EN-US", "Anglais (US)"),
            LanguageOption::new("EN-GB", "Anglais (UK)"),
            LanguageOption::new("DE", "Allemand"),
            LanguageOption::new("ES", "Espagnol"),
            LanguageOption::new("IT", "Italien"),
        ],
    }
}

/// Returns the source language to send, or `None` for auto-detection.
pub fn explicit_source(source_lang: Option<&str>) -> Option<&str> {
    source_lang
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(AUTO_SOURCE))
}

/// Identifies an uploaded document on the provider side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentHandle {
    pub document_id: String,
    pub document_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Queued,
    Translating { seconds_remaining: Option<u64> },
    Done,
    Error(String),
}

#[async_trait]
pub trait DocumentTranslator: Send + Sync {
    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation, AgentError>;

    async fn upload(
        &self,
        path: &Path,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<DocumentHandle, AgentError>;

    async fn status(&self, handle: &DocumentHandle) -> Result<DocumentStatus, AgentError>;

    async fn download(&self, handle: &DocumentHandle) -> Result<Vec<u8>, AgentError>;
}

/// DeepL API v2 client.
#[derive(Clone)]
pub struct DeepLTranslator {
    client: Client,
    api_key: String,
    api_url: String,
}

impl DeepLTranslator {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &TranslationConfig, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AgentError::Other(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            ..Self::new(config.api_key.clone(), config.api_url.clone())
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn auth_header(&self) -> Result<String, AgentError> {
        if self.api_key.trim().is_empty() {
            return Err(AgentError::NotConfigured(
                "Clé API DeepL non configurée".to_string(),
            ));
        }
        Ok(format!("DeepL-Auth-Key {}", self.api_key))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AgentError> {
        let response = request
            .header("Authorization", self.auth_header()?)
            .send()
            .await
            .map_err(|err| AgentError::ProcessError {
                status_code: None,
                message: format!("DeepL request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body));
        }
        Ok(response)
    }

    async fn json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AgentError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|err| AgentError::Other(format!("Failed to parse DeepL response: {err}")))
    }
}

#[async_trait]
impl DocumentTranslator for DeepLTranslator {
    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<TextTranslation, AgentError> {
        let mut params = vec![("text", text), ("target_lang", target_lang)];
        if let Some(source) = explicit_source(source_lang) {
            params.push(("source_lang", source));
        }

        let response: TextResponse = self
            .json(self.client.post(self.url("/translate")).form(&params))
            .await?;
        let first = response.translations.into_iter().next().ok_or_else(|| {
            AgentError::ExecutionFailed("DeepL returned no translation".to_string())
        })?;
        Ok(TextTranslation {
            translated_text: first.text,
            detected_source_language: first.detected_source_language,
        })
    }

    async fn upload(
        &self,
        path: &Path,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<DocumentHandle, AgentError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("target_lang", target_lang.to_string());
        if let Some(source) = explicit_source(source_lang) {
            form = form.text("source_lang", source.to_string());
        }

        self.json(self.client.post(self.url("/document")).multipart(form))
            .await
    }

    async fn status(&self, handle: &DocumentHandle) -> Result<DocumentStatus, AgentError> {
        let url = self.url(&format!("/document/{}", handle.document_id));
        let response: StatusResponse = self
            .json(
                self.client
                    .post(url)
                    .form(&[("document_key", handle.document_key.as_str())]),
            )
            .await?;
        Ok(response.into_status())
    }

    async fn download(&self, handle: &DocumentHandle) -> Result<Vec<u8>, AgentError> {
        let url = self.url(&format!("/document/{}/result", handle.document_id));
        let response = self
            .send(
                self.client
                    .post(url)
                    .form(&[("document_key", handle.document_key.as_str())]),
            )
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| AgentError::Other(format!("Failed to read DeepL result: {err}")))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Deserialize)]
struct TextResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
struct TranslatedText {
    text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    seconds_remaining: Option<u64>,
    #[serde(default)]
    error_message: Option<String>,
}

impl StatusResponse {
    fn into_status(self) -> DocumentStatus {
        match self.status.as_str() {
            "done" => DocumentStatus::Done,
            "queued" => DocumentStatus::Queued,
            "translating" => DocumentStatus::Translating {
                seconds_remaining: self.seconds_remaining,
            },
            "error" => DocumentStatus::Error(
                self.error_message
                    .unwrap_or_else(|| "Erreur de traduction".to_string()),
            ),
            other => DocumentStatus::Error(format!("Statut inconnu: {}", other)),
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

fn map_http_error(status: StatusCode, body: String) -> AgentError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    // 456: quota exceeded, not worth retrying
    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
    );

    AgentError::ProcessError {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_source() {
        assert_eq!(explicit_source(None), None);
        assert_eq!(explicit_source(Some("auto")), None);
        assert_eq!(explicit_source(Some("AUTO")), None);
        assert_eq!(explicit_source(Some(" ")), None);
        assert_eq!(explicit_source(Some("FR")), Some("FR"));
    }

    #[test]
    fn test_status_mapping() {
        let parse = |s: &str| serde_json::from_str::<StatusResponse>(s).unwrap().into_status();
        assert_eq!(parse(r#"{"document_id":"1","status":"done"}"#), DocumentStatus::Done);
        assert_eq!(
            parse(r#"{"status":"translating","seconds_remaining":20}"#),
            DocumentStatus::Translating {
                seconds_remaining: Some(20)
            }
        );
        assert_eq!(
            parse(r#"{"status":"error","error_message":"Source and target language are equal."}"#),
            DocumentStatus::Error("Source and target language are equal.".into())
        );
    }

    #[test]
    fn test_map_http_error() {
        let err = map_http_error(
            StatusCode::FORBIDDEN,
            r#"{"message":"Wrong endpoint"}"#.to_string(),
        );
        assert_eq!(err.to_string(), "Wrong endpoint");
        assert!(!err.is_retryable());
        assert!(map_http_error(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
    }

    #[test]
    fn test_default_languages() {
        let languages = default_languages();
        assert_eq!(languages.source[0].code, "auto");
        assert!(languages.target.iter().any(|l| l.code == "EN-GB"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let translator = DeepLTranslator::new("", "https://api.deepl.com/v2");
        let err = translator
            .translate_text("Bonjour", "EN-US", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotConfigured(_)));
    }
}
