//! Engine configuration
//!
//! Loaded from an `engine.yaml` file; every field has a default so an empty
//! (or absent) file is a valid configuration.
//!
//! ```yaml
//! timeouts:
//!   action_ms: 10000
//!   api_ms: 30000
//!   condition_ms: 10000
//!   poll_interval_ms: 200
//!
//! max_flow_depth: 3
//! artifacts_dir: reports/artifacts
//!
//! environment: staging
//! environments:
//!   staging:
//!     base_url: https://staging.example.com
//!     api_base_url: https://api.staging.example.com
//!     variables:
//!       username: qa-user
//!
//! platforms:
//!   playwright:
//!     browser: chromium
//!     headless: true
//!   web:
//!     validate_ssl: false
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::context::ContextStore;
use super::loader::LoadError;
use super::platform::PlatformsConfig;

/// Environment variable selecting the active environment
pub const ENVIRONMENT_VAR: &str = "KEYWORD_ACTIONS_ENV";

/// Per-call time bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Bound on every UI action dispatched to the action surface
    #[serde(default = "default_action_ms")]
    pub action_ms: u64,

    /// Bound on every HTTP call
    #[serde(default = "default_api_ms")]
    pub api_ms: u64,

    /// Bound on existence probes and `WAIT_UNTIL` polling
    #[serde(default = "default_condition_ms")]
    pub condition_ms: u64,

    /// Interval between `WAIT_UNTIL` probes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_action_ms() -> u64 {
    10_000
}

fn default_api_ms() -> u64 {
    30_000
}

fn default_condition_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    200
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: default_action_ms(),
            api_ms: default_api_ms(),
            condition_ms: default_condition_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn api(&self) -> Duration {
        Duration::from_millis(self.api_ms)
    }

    pub fn condition(&self) -> Duration {
        Duration::from_millis(self.condition_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// A named target environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_base_url: String,

    /// Extra values seeded into every test case context
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default = "default_max_flow_depth")]
    pub max_flow_depth: usize,

    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Name of the active environment
    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub environments: HashMap<String, Environment>,

    #[serde(default)]
    pub platforms: PlatformsConfig,
}

fn default_max_flow_depth() -> usize {
    3
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("reports/artifacts")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            max_flow_depth: default_max_flow_depth(),
            artifacts_dir: default_artifacts_dir(),
            environment: None,
            environments: HashMap::new(),
            platforms: PlatformsConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }

    /// Select the active environment: explicit override, then
    /// `KEYWORD_ACTIONS_ENV`, then the configured `environment`.
    pub fn select_environment(&mut self, name: Option<&str>) {
        let from_env = std::env::var(ENVIRONMENT_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty());
        if let Some(selected) = name.map(str::to_string).or(from_env) {
            self.environment = Some(selected);
        }
    }

    /// The active environment, if one is selected and defined
    pub fn active_environment(&self) -> Option<&Environment> {
        self.environments.get(self.environment.as_deref()?)
    }

    /// Base URL for UI navigation
    pub fn base_url(&self) -> String {
        self.active_environment()
            .map(|env| env.base_url.clone())
            .unwrap_or_default()
    }

    /// Base URL for API calls; falls back to the web platform setting
    pub fn api_base_url(&self) -> String {
        self.active_environment()
            .map(|env| env.api_base_url.clone())
            .filter(|url| !url.is_empty())
            .or_else(|| self.platforms.web.as_ref().map(|web| web.base_url.clone()))
            .unwrap_or_default()
    }

    /// Initial context for every test case
    pub fn seed_context(&self) -> ContextStore {
        let mut ctx = ContextStore::new();
        ctx.set("BASE_URL", self.base_url());
        ctx.set("API_BASE_URL", self.api_base_url());
        ctx.set("TIMEOUT_MS", self.timeouts.action_ms);
        ctx.set("ARTIFACTS_DIR", self.artifacts_dir.display().to_string());
        if let Some(env) = self.active_environment() {
            for (key, value) in &env.variables {
                ctx.set(key.clone(), value.clone());
            }
        }
        ctx
    }
}
