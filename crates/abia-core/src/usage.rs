//! Token usage accounting.
//!
//! Statistics are process-wide, not per session. Daily and monthly counters
//! roll over based on the date of the last recorded call.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Model label reported before any call has been recorded.
pub const DEFAULT_STATS_MODEL: &str = "DeepSeek";

/// Token counts for a single provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Aggregated token usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    #[serde(default)]
    pub today: u64,
    #[serde(default)]
    pub month: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub last_call: Option<DateTime<Utc>>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_STATS_MODEL.to_string()
}

impl Default for TokenStats {
    fn default() -> Self {
        Self {
            today: 0,
            month: 0,
            total: 0,
            last_call: None,
            model: default_model(),
        }
    }
}

impl TokenStats {
    /// Resets the daily and monthly counters when `now` is past the last call's day or month.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let Some(last) = self.last_call else {
            self.today = 0;
            self.month = 0;
            return;
        };
        if last.date_naive() != now.date_naive() {
            self.today = 0;
        }
        if (last.year(), last.month()) != (now.year(), now.month()) {
            self.month = 0;
        }
    }

    /// Adds a call's usage, rolling counters over first.
    pub fn record(&mut self, usage: TokenUsage, model: &str, now: DateTime<Utc>) {
        self.roll_over(now);
        let tokens = usage.total();
        self.today += tokens;
        self.month += tokens;
        self.total += tokens;
        self.last_call = Some(now);
        self.model = model.to_string();
    }
}

/// Rough token estimate for a text: one token per 0.75 word.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0;
    }
    (words as f64 / 0.75).ceil() as u64
}

/// Estimate for a list of message contents, with 4 tokens of overhead per message.
pub fn estimate_messages_tokens<'a>(contents: impl IntoIterator<Item = &'a str>) -> u64 {
    contents
        .into_iter()
        .map(|c| estimate_tokens(c) + 4)
        .sum()
}

/// Persistence for the global token statistics.
#[async_trait]
pub trait TokenStatsRepository: Send + Sync {
    /// Returns the stored statistics with counters rolled over to today.
    async fn load(&self) -> Result<TokenStats>;

    /// Records one call and returns the updated statistics.
    async fn record(&self, usage: TokenUsage, model: &str) -> Result<TokenStats>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_record_same_day_accumulates() {
        let mut stats = TokenStats::default();
        stats.record(TokenUsage::new(10, 5), "deepseek-chat", at(2024, 3, 10));
        stats.record(TokenUsage::new(1, 1), "deepseek-chat", at(2024, 3, 10));
        assert_eq!(stats.today, 17);
        assert_eq!(stats.month, 17);
        assert_eq!(stats.total, 17);
        assert_eq!(stats.model, "deepseek-chat");
    }

    #[test]
    fn test_day_rollover_keeps_month() {
        let mut stats = TokenStats::default();
        stats.record(TokenUsage::new(100, 0), "m", at(2024, 3, 10));
        stats.record(TokenUsage::new(5, 0), "m", at(2024, 3, 11));
        assert_eq!(stats.today, 5);
        assert_eq!(stats.month, 105);
        assert_eq!(stats.total, 105);
    }

    #[test]
    fn test_month_rollover_resets_both() {
        let mut stats = TokenStats::default();
        stats.record(TokenUsage::new(100, 0), "m", at(2024, 3, 31));
        stats.roll_over(at(2024, 4, 1));
        assert_eq!(stats.today, 0);
        assert_eq!(stats.month, 0);
        assert_eq!(stats.total, 100);
    }

    #[test]
    fn test_same_month_different_year_resets_month() {
        let mut stats = TokenStats::default();
        stats.record(TokenUsage::new(7, 0), "m", at(2023, 3, 10));
        stats.roll_over(at(2024, 3, 10));
        assert_eq!(stats.month, 0);
    }

    #[test]
    fn test_estimates() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("un deux trois"), 4);
        assert_eq!(estimate_messages_tokens(["un deux trois", ""]), 4 + 4 + 4);
    }

    #[test]
    fn test_default_serialization_shape() {
        let value = serde_json::to_value(TokenStats::default()).unwrap();
        assert_eq!(value["today"], 0);
        assert!(value["lastCall"].is_null());
        assert_eq!(value["model"], "DeepSeek");
    }
}
