//! IPC command handlers.
//!
//! Session accessors fail with a transport error tagged by the error code.
//! Domain channels (`process-*`, `generate-letter`, `translate-*`,
//! `set-active-agent`) always succeed at the transport level and report
//! failures inside their result object, which is what the UI expects.

pub mod assistant;
pub mod plugins;
pub mod session;
pub mod store;
pub mod translation;

use abia_core::error::AbiaError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::app::AppState;
use crate::ipc::{EventSink, Request};

/// Transport-level failure of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandError {
    pub code: String,
    pub message: String,
}

impl CommandError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("invalid_arguments", message)
    }
}

impl From<AbiaError> for CommandError {
    fn from(error: AbiaError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_message(),
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(error: serde_json::Error) -> Self {
        Self::new("serialization", error.to_string())
    }
}

pub type CommandResult = Result<Value, CommandError>;

/// Positional arguments of a request.
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Argument `index`, treating JSON `null` as absent.
    pub fn optional<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<Option<T>, CommandError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| CommandError::invalid_argument(format!("Invalid '{}': {}", name, e))),
        }
    }

    pub fn required<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<T, CommandError> {
        self.optional(index, name)?
            .ok_or_else(|| CommandError::invalid_argument(format!("Missing argument '{}'", name)))
    }

    /// Raw argument, `null` when absent.
    pub fn raw(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or(Value::Null)
    }
}

/// Routes a request to its handler.
pub async fn dispatch(state: &AppState, request: &Request, events: &EventSink) -> CommandResult {
    let args = Args::new(&request.args);
    match request.channel.as_str() {
        "create-new-session" => session::create_new_session(state).await,
        "get-current-context" => session::get_current_context(state).await,
        "get-conversation-history" => session::get_conversation_history(state, &args).await,
        "get-active-agent" => session::get_active_agent(state).await,
        "set-active-agent" => session::set_active_agent(state, &args).await,
        "get-active-files" => session::get_active_files(state).await,
        "add-active-file" => session::add_active_file(state, &args).await,
        "remove-active-file" => session::remove_active_file(state, &args).await,
        "list-sessions" => session::list_sessions(state, &args).await,
        "load-session" => session::load_session(state, &args).await,

        "process-query" => assistant::process_query(state, &args).await,
        "process-excel-file" => assistant::process_excel_file(state, &args).await,
        "process-document" => assistant::process_document(state, &args).await,
        "generate-letter" => assistant::generate_letter(state, &args).await,
        "get-letter-templates" => assistant::get_letter_templates(state).await,

        "translate-text" => translation::translate_text(state, &args).await,
        "translate-document" => {
            translation::translate_document(state, request.id, &args, events).await
        }
        "cancel-translation" => translation::cancel_translation(state, &args).await,
        "get-supported-languages" => translation::get_supported_languages(state).await,
        "get-supported-file-types" => translation::get_supported_file_types(state).await,

        "get-token-stats" => store::get_token_stats(state).await,
        "get-store-value" => store::get_store_value(state, &args).await,
        "set-store-value" => store::set_store_value(state, &args).await,
        "search-memory" => store::search_memory(state, &args).await,

        "list-plugins" => plugins::list_plugins(state).await,
        "invoke-plugin" => plugins::invoke_plugin(state, &args).await,

        other => Err(CommandError::new(
            "unknown_channel",
            format!("Unknown channel '{}'", other),
        )),
    }
}
