use abia_core::session::{ContextSnapshot, FileRef, Session};
use serde_json::json;

use super::{Args, CommandResult};
use crate::app::{AppState, Services};

async fn snapshot(services: &Services, session: Session) -> CommandResult {
    let token_stats = services.token_stats.load().await?;
    Ok(serde_json::to_value(ContextSnapshot {
        session,
        token_stats,
    })?)
}

pub async fn create_new_session(state: &AppState) -> CommandResult {
    let services = state.services()?;
    let id = services.sessions.create_new_session().await?;
    Ok(json!(id))
}

pub async fn get_current_context(state: &AppState) -> CommandResult {
    let services = state.services()?;
    let session = services.sessions.current_context().await?;
    snapshot(&services, session).await
}

/// `limit` is optional; negative values yield an empty list.
pub async fn get_conversation_history(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let limit = args
        .optional::<i64>(0, "limit")?
        .map(|l| usize::try_from(l).unwrap_or(0));
    let turns = services.sessions.conversation_history(limit).await?;
    Ok(serde_json::to_value(turns)?)
}

pub async fn get_active_agent(state: &AppState) -> CommandResult {
    let services = state.services()?;
    let agent = services.sessions.active_agent().await?;
    Ok(json!(agent))
}

/// Always answers `{success, agent?, error?}`.
pub async fn set_active_agent(state: &AppState, args: &Args<'_>) -> CommandResult {
    let outcome = async {
        let services = state.services()?;
        let agent = args.required::<String>(0, "agentId")?;
        Ok::<_, super::CommandError>(services.sessions.set_active_agent(&agent).await?)
    }
    .await;

    Ok(match outcome {
        Ok(agent) => {
            tracing::info!("[Session] Active agent set to {}", agent);
            json!({ "success": true, "agent": agent })
        }
        Err(e) => {
            tracing::warn!("[Session] Could not set active agent: {}", e.message);
            json!({ "success": false, "error": e.message })
        }
    })
}

pub async fn get_active_files(state: &AppState) -> CommandResult {
    let services = state.services()?;
    let files = services.sessions.active_files().await?;
    Ok(serde_json::to_value(files)?)
}

pub async fn add_active_file(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let path = args.required::<String>(0, "path")?;
    let added = services
        .sessions
        .add_active_file(FileRef::stat(path).await)
        .await?;
    Ok(json!(added))
}

pub async fn remove_active_file(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let path = args.required::<String>(0, "path")?;
    let removed = services.sessions.remove_active_file(&path).await?;
    Ok(json!(removed))
}

pub async fn list_sessions(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let limit = args
        .optional::<i64>(0, "limit")?
        .map(|l| usize::try_from(l).unwrap_or(0))
        .unwrap_or(services.config.storage.list_limit);
    let sessions = services.sessions.list_sessions(limit).await?;
    Ok(serde_json::to_value(sessions)?)
}

pub async fn load_session(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let session_id = args.required::<String>(0, "sessionId")?;
    let session = services.sessions.load_context(&session_id).await?;
    snapshot(&services, session).await
}
