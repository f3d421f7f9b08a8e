//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::model::Session;
use anyhow::Result;
use async_trait::async_trait;

/// An abstract repository for session records.
///
/// One record per session. Records are replaced on save and never deleted;
/// resuming an old conversation relies on them staying around.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Saves (inserts or replaces) a session record.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Lists all stored sessions, in no particular order.
    async fn list_all(&self) -> Result<Vec<Session>>;
}
