/*!
common/src/lib.rs

Shared configuration types for the techdigest bot.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader merging a default file with an optional override file
- Parsing of the scheduler's wall-clock run times
*/

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Telegram bot configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Name of the environment variable holding the bot token
    pub token_env: String,
    /// Override for the Bot API base URL (tests, proxies)
    pub api_url: Option<String>,
    /// Long-poll window for getUpdates, seconds
    pub poll_timeout_seconds: Option<u64>,
}

/// News source configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Name of the environment variable holding the NewsAPI key
    pub api_key_env: String,
    /// Article language code requested from the news source
    pub language: Option<String>,
    /// Candidate batch size per tick
    pub page_size: Option<u32>,
}

/// Remote completion provider configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// Scheduler (digest times) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// List of wall-clock times in "HH:MM" 24h format when a digest runs
    pub times: Vec<String>,
}

impl SchedulerConfig {
    /// Parse the configured "HH:MM" entries, failing on the first
    /// malformed one.
    pub fn parsed_times(&self) -> Result<Vec<NaiveTime>> {
        self.times
            .iter()
            .map(|entry| {
                NaiveTime::parse_from_str(entry, "%H:%M")
                    .with_context(|| format!("invalid scheduler time {:?}", entry))
            })
            .collect()
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional
    /// override file. If both are present, they are merged (override
    /// takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
