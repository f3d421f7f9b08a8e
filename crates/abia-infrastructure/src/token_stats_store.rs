//! Global token usage persisted to `token_stats.json`.

use crate::paths::AbiaPaths;
use crate::storage::{load_json, update_json};
use abia_core::error::Result;
use abia_core::usage::{TokenStats, TokenStatsRepository, TokenUsage};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;

pub struct TokenStatsStore {
    path: PathBuf,
}

impl TokenStatsStore {
    pub fn new(paths: &AbiaPaths) -> Self {
        Self::with_file(paths.token_stats_file())
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStatsRepository for TokenStatsStore {
    async fn load(&self) -> Result<TokenStats> {
        let mut stats = load_json::<TokenStats>(self.path.clone())
            .await
            .context("Failed to load token stats")?
            .unwrap_or_default();
        stats.roll_over(Utc::now());
        Ok(stats)
    }

    async fn record(&self, usage: TokenUsage, model: &str) -> Result<TokenStats> {
        let model = model.to_string();
        let stats = update_json(self.path.clone(), TokenStats::default(), move |stats| {
            stats.record(usage, &model, Utc::now())
        })
        .await?;
        tracing::debug!(
            "[Usage] +{} tokens (today {}, month {}, total {})",
            usage.total(),
            stats.today,
            stats.month,
            stats.total
        );
        Ok(stats)
    }
}
