//! Errors raised by agents and their providers.

use abia_core::error::AbiaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The remote provider answered with an error, or could not be reached.
    #[error("{message}")]
    ProcessError {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
    },

    /// A required credential or binary is missing.
    #[error("{0}")]
    NotConfigured(String),

    /// The agent ran but could not produce an answer.
    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Opération annulée")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProcessError {
                is_retryable: true,
                ..
            }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            AgentError::ProcessError { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Converts into the shared error type, tagging the failing service.
    pub fn into_external(self, service: &str) -> AbiaError {
        AbiaError::external(service, self.to_string())
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(format!("{:#}", err))
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_external_keeps_message() {
        let err = AgentError::ProcessError {
            status_code: Some(429),
            message: "Too many requests".into(),
            is_retryable: true,
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), Some(429));

        let abia = err.into_external("llm");
        assert!(abia.is_external());
        assert_eq!(abia.code(), "external_service");
        assert!(abia.to_string().contains("Too many requests"));
    }

    #[test]
    fn test_cancelled_is_not_retryable() {
        assert!(!AgentError::Cancelled.is_retryable());
        assert_eq!(AgentError::Cancelled.status_code(), None);
    }
}
