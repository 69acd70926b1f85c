//! Settings for the fitness coach harness.
//!
//! A TOML file supplies the base values, a `.env` file and the process
//! environment override them, and the result is validated once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the hosted-model API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Everything read from `fitcoach.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name sessions and memories are scoped under
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Hosted-model API key; normally supplied via `GOOGLE_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for the OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Sampling temperature for every agent
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Safety limit on model/tool round trips per agent invocation
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

fn default_app_name() -> String {
    "agents".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_tool_iterations() -> usize {
    25
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_tool_iterations", &self.max_tool_iterations)
            .field("models", &self.models)
            .field("retry", &self.retry)
            .field("session", &self.session)
            .field("memory", &self.memory)
            .finish()
    }
}

/// Which hosted model backs each agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// The fitness coordinator
    #[serde(default = "default_root_model")]
    pub root: String,

    /// The workout and diet planners
    #[serde(default = "default_light_model")]
    pub planner: String,

    /// The search-grounded delegate
    #[serde(default = "default_light_model")]
    pub search: String,
}

fn default_root_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_light_model() -> String {
    "gemini-2.5-flash-lite".into()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            root: default_root_model(),
            planner: default_light_model(),
            search: default_light_model(),
        }
    }
}

/// Retry settings shared by every hosted-model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total calls allowed, including the first
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Multiplier applied to the delay after each failure
    #[serde(default = "default_exp_base")]
    pub exp_base: f64,

    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,

    /// Upper bound on a single delay; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_secs: Option<f64>,

    /// HTTP statuses that are worth retrying
    #[serde(default = "default_retry_codes")]
    pub http_status_codes: Vec<u16>,
}

fn default_attempts() -> u32 {
    5
}
fn default_exp_base() -> f64 {
    7.0
}
fn default_initial_delay_secs() -> f64 {
    1.0
}
fn default_retry_codes() -> Vec<u16> {
    vec![429, 500, 503, 504]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            exp_base: default_exp_base(),
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: None,
            http_status_codes: default_retry_codes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_backend")]
    pub backend: SessionBackend,

    #[serde(default = "default_db_url")]
    pub db_url: String,

    /// User the chat loop talks as
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Session the chat loop resumes; a new one is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn default_session_backend() -> SessionBackend {
    SessionBackend::Sqlite
}
fn default_db_url() -> String {
    "sqlite://agent_data.db".into()
}
fn default_user_id() -> String {
    "user".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            db_url: default_db_url(),
            user_id: default_user_id(),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    InMemory,
    None,
}

/// What to do when the post-turn memory write-back fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteBackPolicy {
    /// Warn and keep going; the reply has already been delivered
    #[default]
    Log,
    /// Fail the turn
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: MemoryBackend,

    #[serde(default)]
    pub write_back: WriteBackPolicy,

    /// Max entries returned by `load_memory`
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_memory_backend() -> MemoryBackend {
    MemoryBackend::InMemory
}
fn default_search_limit() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            write_back: WriteBackPolicy::default(),
            search_limit: default_search_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration the way the binary does at startup.
    ///
    /// Order: `.env` in the working directory, then the config file
    /// (`./fitcoach.toml`, else `~/.fitcoach/config.toml`), then env vars:
    /// - `GOOGLE_API_KEY`
    /// - `FITCOACH_MODEL` (coordinator model)
    /// - `FITCOACH_PLANNER_MODEL`
    /// - `FITCOACH_DB_URL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Like [`AppConfig::load`] but with an explicit config file.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_path) = dotenvy::dotenv() {
            tracing::debug!(path = %env_path.display(), "Loaded .env");
        }

        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse one TOML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("FITCOACH_MODEL") {
            self.models.root = model;
        }
        if let Some(model) = lookup("FITCOACH_PLANNER_MODEL") {
            self.models.planner = model;
        }
        if let Some(url) = lookup("FITCOACH_DB_URL") {
            self.session.db_url = url;
        }
    }

    /// `./fitcoach.toml` when present, otherwise `~/.fitcoach/config.toml`.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("fitcoach.toml");
        if local.exists() {
            local
        } else {
            Self::config_dir().join("config.toml")
        }
    }

    /// `~/.fitcoach`
    pub fn config_dir() -> PathBuf {
        home_dir().join(".fitcoach")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let retry = &self.retry;
        let checks = [
            (
                (0.0..=2.0).contains(&self.temperature),
                "temperature must be between 0.0 and 2.0",
            ),
            (!self.app_name.trim().is_empty(), "app_name must not be empty"),
            (self.max_tool_iterations > 0, "max_tool_iterations must be at least 1"),
            (retry.attempts > 0, "retry.attempts must be at least 1"),
            (retry.exp_base >= 1.0, "retry.exp_base must be >= 1.0"),
            (
                retry.initial_delay_secs >= 0.0,
                "retry.initial_delay_secs must not be negative",
            ),
            (
                retry.max_delay_secs.is_none_or(|d| d >= 0.0),
                "retry.max_delay_secs must not be negative",
            ),
        ];

        match checks.into_iter().find(|(ok, _)| !ok) {
            Some((_, problem)) => Err(ConfigError::Invalid(problem.into())),
            None => Ok(()),
        }
    }

    /// The API key, or the startup error explaining how to provide one.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// The defaults rendered as TOML, as written by `fitcoach init`.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_tool_iterations: default_max_tool_iterations(),
            models: ModelsConfig::default(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("{API_KEY_ENV} is not set; export it or add it to a .env file")]
    MissingApiKey,
}
