//! Session domain module.
//!
//! This module contains all session-related domain models, the repository
//! interface, and the manager that owns the current session.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionSummary`, `ContextSnapshot`)
//! - `message`: Conversation turn types (`TurnRole`, `Turn`)
//! - `agent`: Agent enumeration (`AgentKind`)
//! - `file_ref`: Attached file references (`FileRef`)
//! - `repository`: Repository trait for session persistence
//! - `manager`: Session lifecycle management (`SessionManager`)

mod agent;
mod file_ref;
mod manager;
mod message;
mod model;
mod repository;

// Re-export public API
pub use agent::AgentKind;
pub use file_ref::{
    FILE_TYPE_DOCUMENT, FILE_TYPE_EXCEL, FILE_TYPE_PDF, FILE_TYPE_TEXT, FILE_TYPE_WORD, FileRef,
    file_type_tag,
};
pub use manager::SessionManager;
pub use message::{Turn, TurnRole};
pub use model::{ContextSnapshot, PREVIEW_MAX_CHARS, Session, SessionId, SessionSummary};
pub use repository::SessionRepository;
