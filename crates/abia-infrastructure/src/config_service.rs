//! Configuration loading.
//!
//! Reads `config.toml` (from `--config` or the data directory), fills
//! missing fields with defaults and applies environment overrides.

use abia_core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Loads the application configuration once at startup.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file, creating it with defaults when it does not exist.
    ///
    /// Environment overrides from the process environment are applied to
    /// the returned value but never written back.
    pub async fn load(&self) -> Result<AppConfig> {
        let mut config = self.load_file().await?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads the file without environment overrides.
    pub async fn load_file(&self) -> Result<AppConfig> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => AppConfig::from_toml_str(&content)
                .with_context(|| format!("Invalid configuration in {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = AppConfig::default();
                if let Err(e) = self.write_default(&config).await {
                    tracing::warn!(
                        "[Config] Could not write default config to {}: {:#}",
                        self.path.display(),
                        e
                    );
                } else {
                    tracing::info!("[Config] Created default config at {}", self.path.display());
                }
                Ok(config)
            }
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        }
    }

    async fn write_default(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(config)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}
