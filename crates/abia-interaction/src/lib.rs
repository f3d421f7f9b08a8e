//! Agent implementations for the ABIA assistant.
//!
//! [`AgentRouter`] implements the core `IntegrationService` contract on top
//! of the domain agents: chat through an OpenAI-compatible model, Excel and
//! document analysis through Python extraction scripts, local filesystem
//! answers, letter generation and DeepL translation.

pub mod agents;
pub mod classifier;
pub mod error;
pub mod llm_client;
pub mod python_runner;
pub mod router;
pub mod translator;

pub use agents::translation::PollPolicy;
pub use classifier::{Classification, ClassificationCache, classify};
pub use error::AgentError;
pub use llm_client::{ChatMessage, Completion, LlmClient, OpenAiCompatClient};
pub use python_runner::PythonRunner;
pub use router::{AgentRouter, Providers};
pub use translator::{DeepLTranslator, DocumentHandle, DocumentStatus, DocumentTranslator};
