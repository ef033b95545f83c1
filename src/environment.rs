// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const LOCAL_API_URL: &str = "http://127.0.0.1:8000/api";
pub const PRODUCTION_API_URL: &str = "https://api.jobflow.app/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub api_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: Option<EnvironmentConfig>,
    production: Option<EnvironmentConfig>,
}

impl EnvironmentConfig {
    /// Load configuration for the current environment.
    ///
    /// `config.yaml` in the working directory is optional; without it the
    /// built-in host for the environment is used. `JOBFLOW_API_URL` and
    /// `JOBFLOW_TIMEOUT_SECS` override whatever was loaded.
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config = Self::load_from_file(Path::new("config.yaml"), &environment)?
            .unwrap_or_else(|| Self::builtin(&environment));

        config.with_env_overrides()
    }

    pub fn get_environment() -> String {
        std::env::var("JOBFLOW_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    pub fn is_production(environment: &str) -> bool {
        environment == "production"
    }

    pub fn builtin(environment: &str) -> Self {
        let api_url = if Self::is_production(environment) {
            PRODUCTION_API_URL
        } else {
            LOCAL_API_URL
        };

        Self {
            api_url: api_url.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Returns `None` when the file does not exist or has no section for
    /// the environment.
    pub fn load_from_file(config_path: &Path, environment: &str) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let config_content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config_file: ConfigFile = serde_yaml::from_str(&config_content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let env_config = if Self::is_production(environment) {
            config_file.production
        } else {
            config_file.local
        };

        Ok(env_config.map(|c| c.normalized()))
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("JOBFLOW_API_URL") {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }

        if let Ok(timeout) = std::env::var("JOBFLOW_TIMEOUT_SECS") {
            self.timeout_seconds = timeout
                .parse::<u64>()
                .context("JOBFLOW_TIMEOUT_SECS must be a number of seconds")?;
        }

        Ok(self.normalized())
    }

    /// Endpoint paths start with `/`, so a trailing slash on the base is dropped.
    fn normalized(mut self) -> Self {
        let trimmed = self.api_url.trim().trim_end_matches('/').to_string();
        self.api_url = trimmed;
        self
    }

    /// Default location of the session database.
    pub fn default_session_db_path() -> PathBuf {
        if let Ok(path) = std::env::var("JOBFLOW_SESSION_DB") {
            return PathBuf::from(path);
        }

        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".jobflow")
            .join("session.db")
    }
}
