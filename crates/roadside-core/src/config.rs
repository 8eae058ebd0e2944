//! Tracker configuration
//!
//! Loaded from `~/.roadside/config.toml` (or an explicit path) with
//! `ROADSIDE_API_URL` / `ROADSIDE_API_TOKEN` environment overrides.
//!
//! ```toml
//! [api]
//! base_url = "https://api.example.com"
//! token = "eyJhbGciOi..."
//! timeout_secs = 30
//!
//! [poll]
//! interval_ms = 3000
//! initial_delay_ms = 0
//! accepted_states = ["ACCEPTED"]
//! refused_states = ["REFUSED", "CANCELLED"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;
use crate::poller::PollConfig;
use crate::status::{RequestState, TerminalStates};

pub const ENV_API_URL: &str = "ROADSIDE_API_URL";
pub const ENV_API_TOKEN: &str = "ROADSIDE_API_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    pub poll: PollSettings,
}

/// Breakdowns API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub initial_delay_ms: u64,
    pub accepted_states: Vec<String>,
    pub refused_states: Vec<String>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            initial_delay_ms: 0,
            accepted_states: vec!["ACCEPTED".to_string()],
            refused_states: vec!["REFUSED".to_string(), "CANCELLED".to_string()],
        }
    }
}

impl TrackerConfig {
    /// `~/.roadside/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".roadside").join("config.toml"))
    }

    /// Load configuration and apply environment overrides
    ///
    /// An explicit `path` must exist. Without one, a missing default file
    /// means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override API settings from the environment (empty values are ignored)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be at least 1".into()));
        }
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Invalid("poll.interval_ms must be at least 1".into()));
        }
        self.terminal_states().map(|_| ())
    }

    pub fn terminal_states(&self) -> Result<TerminalStates, ConfigError> {
        let accepted = parse_states("poll.accepted_states", &self.poll.accepted_states)?;
        let refused = parse_states("poll.refused_states", &self.poll.refused_states)?;
        let terminal = TerminalStates::new(accepted, refused);

        if let Some(state) = terminal.overlap() {
            return Err(ConfigError::Invalid(format!(
                "{state} is listed in both poll.accepted_states and poll.refused_states"
            )));
        }
        Ok(terminal)
    }

    pub fn poll_config(&self) -> Result<PollConfig, ConfigError> {
        Ok(PollConfig::default()
            .with_interval(Duration::from_millis(self.poll.interval_ms))
            .with_initial_delay(Duration::from_millis(self.poll.initial_delay_ms))
            .with_terminal_states(self.terminal_states()?))
    }
}

fn parse_states(field: &str, names: &[String]) -> Result<Vec<RequestState>, ConfigError> {
    names
        .iter()
        .map(|name| {
            RequestState::parse_known(name).ok_or_else(|| {
                let known: Vec<String> = RequestState::KNOWN.iter().map(|s| s.to_string()).collect();
                ConfigError::Invalid(format!(
                    "unknown state '{name}' in {field} (expected one of {})",
                    known.join(", ")
                ))
            })
        })
        .collect()
}
