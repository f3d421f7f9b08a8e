use abia_core::memory::{MemoryIndex, MemoryMetadata};
use abia_core::usage::TokenStats;
use serde_json::json;

use super::{Args, CommandResult};
use crate::app::AppState;

pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Falls back to zeroed statistics when the file cannot be read.
pub async fn get_token_stats(state: &AppState) -> CommandResult {
    let services = state.services()?;
    let stats = match services.token_stats.load().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("[Usage] Failed to read token stats: {}", e);
            TokenStats::default()
        }
    };
    Ok(serde_json::to_value(stats)?)
}

pub async fn get_store_value(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let key = args.required::<String>(0, "key")?;
    let value = services.state_repository.get_value(&key).await?;
    Ok(value.unwrap_or_else(|| args.raw(1)))
}

pub async fn set_store_value(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let key = args.required::<String>(0, "key")?;
    services.state_repository.set_value(&key, args.raw(1)).await?;
    Ok(json!(true))
}

/// `search-memory query, k?, filter?`
pub async fn search_memory(state: &AppState, args: &Args<'_>) -> CommandResult {
    let services = state.services()?;
    let query = args.required::<String>(0, "query")?;
    let k = args
        .optional::<usize>(1, "k")?
        .unwrap_or(DEFAULT_SEARCH_RESULTS);
    let filter = args.optional::<MemoryMetadata>(2, "filter")?;
    let hits = services
        .vector_store
        .search(&query, k, filter.as_ref())
        .await?;
    Ok(serde_json::to_value(hits)?)
}
