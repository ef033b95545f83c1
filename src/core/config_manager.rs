// src/core/config_manager.rs
//! Unified configuration management for the CLI and embedding applications

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::environment::EnvironmentConfig;

pub const DEFAULT_LOG_FILE: &str = "/tmp/jobflow.log";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub session: SessionStoreConfig,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub database_path: PathBuf,
}

impl ConfigManager {
    /// Load all configurations
    pub fn load() -> Result<Self> {
        let environment = EnvironmentConfig::load()?;
        let session = Self::load_session()?;
        let log_file = Self::log_file_path();

        info!("API base URL: {}", environment.api_url);

        Ok(Self {
            environment,
            session,
            log_file,
        })
    }

    /// Log destination, resolved before anything else is loaded.
    pub fn log_file_path() -> PathBuf {
        std::env::var("JOBFLOW_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE))
    }

    fn load_session() -> Result<SessionStoreConfig> {
        let database_path = EnvironmentConfig::default_session_db_path();
        let database_path = if database_path.is_absolute() {
            database_path
        } else {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(database_path)
        };

        Ok(SessionStoreConfig { database_path })
    }

    /// Override the session database, e.g. from a CLI flag.
    pub fn with_session_db(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.session.database_path = path;
        }
        self
    }

    /// Ensure the session database directory exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.session.database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }
}
