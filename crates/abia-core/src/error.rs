//! Error types for the ABIA assistant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole assistant.
///
/// Every failing operation returns one of these tagged variants so the IPC
/// layer can forward `{code, message}` to the UI without guessing intent.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AbiaError {
    /// An accessor was called before any session was created or restored.
    #[error("No active session")]
    NoActiveSession,

    /// The requested session does not exist in storage.
    #[error("Session not found: '{id}'")]
    SessionNotFound { id: String },

    /// The value is not a member of the agent enumeration.
    #[error("Unknown agent type: '{value}'")]
    InvalidAgent { value: String },

    /// Persistence layer unreachable or write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Provider or subprocess failure, carrying the provider message.
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    /// A request arrived before the initialization gate ran.
    #[error("Services are not initialized")]
    NotInitialized,

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Plugin registration or invocation error
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AbiaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { id: id.into() }
    }

    pub fn invalid_agent(value: impl Into<String>) -> Self {
        Self::InvalidAgent {
            value: value.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    pub fn is_invalid_agent(&self) -> bool {
        matches!(self, Self::InvalidAgent { .. })
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }

    /// Stable machine-readable tag, forwarded to the UI next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "no_active_session",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::InvalidAgent { .. } => "invalid_agent",
            Self::Storage(_) => "storage",
            Self::ExternalService { .. } => "external_service",
            Self::NotInitialized => "not_initialized",
            Self::Io { .. } => "io",
            Self::Serialization { .. } => "serialization",
            Self::Config(_) => "config",
            Self::Plugin(_) => "plugin",
            Self::Internal(_) => "internal",
        }
    }

    /// Message without the variant prefix, used for `{success:false, error}` payloads.
    pub fn user_message(&self) -> String {
        match self {
            Self::ExternalService { message, .. } => message.clone(),
            Self::Storage(message) | Self::Config(message) | Self::Plugin(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for AbiaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for AbiaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AbiaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for AbiaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Repositories report failures through `anyhow`; at the core boundary they
/// all mean the persistence layer failed.
impl From<anyhow::Error> for AbiaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", err))
    }
}

/// A type alias for `Result<T, AbiaError>`.
pub type Result<T> = std::result::Result<T, AbiaError>;
