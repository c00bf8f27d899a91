//! Shell configuration
//!
//! [`Config`] carries the single option the navigation core recognises: the
//! `unpack` hook that turns a raw payload into a typed [`Response`].
//! [`ShellSettings`] holds the settings of the binary (where the service
//! lives, timeouts, log file) and is loaded from a TOML file, then from
//! `BRIDGE_SHELL_*` environment variables.

use crate::frame::Response;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maps a raw remote payload into a typed response
pub type Unpack = Arc<dyn Fn(Value) -> Result<Response> + Send + Sync>;

#[derive(Clone)]
pub struct Config {
    pub unpack: Unpack,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unpack: Arc::new(Response::from_value),
        }
    }
}

impl Config {
    pub fn with_unpack(unpack: impl Fn(Value) -> Result<Response> + Send + Sync + 'static) -> Self {
        Self {
            unpack: Arc::new(unpack),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}

/// Settings of the `bridge-shell` binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Origin of the remote rendering service, e.g. `http://localhost:8000`
    pub base_url: String,

    pub request_timeout_secs: u64,

    pub connect_timeout_secs: u64,

    pub user_agent: String,

    /// Where log output goes (truncated on each run)
    pub log_file: PathBuf,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!("bridge-shell/", env!("CARGO_PKG_VERSION")).to_string(),
            log_file: PathBuf::from("bridge-shell.log"),
        }
    }
}

impl ShellSettings {
    /// Location of the settings file in the user's config directory
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("bridge-shell")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".bridge-shell")
        };

        Ok(config_dir.join("config.toml"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse settings")
    }

    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// An explicitly named file must exist; a missing default file just
    /// means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !path.exists() {
            if required {
                anyhow::bail!("Settings file not found: {:?}", path);
            }
            log::debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        log::debug!("Loading settings from: {:?}", path);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid settings file: {:?}", path))
    }

    /// Override fields from `BRIDGE_SHELL_*` variables, looked up through
    /// `lookup` so callers decide where variables come from.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(base_url) = lookup("BRIDGE_SHELL_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(timeout) = lookup("BRIDGE_SHELL_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid BRIDGE_SHELL_REQUEST_TIMEOUT_SECS: {}", timeout))?;
        }
        if let Some(timeout) = lookup("BRIDGE_SHELL_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid BRIDGE_SHELL_CONNECT_TIMEOUT_SECS: {}", timeout))?;
        }
        if let Some(user_agent) = lookup("BRIDGE_SHELL_USER_AGENT") {
            self.user_agent = user_agent;
        }
        if let Some(log_file) = lookup("BRIDGE_SHELL_LOG_FILE") {
            self.log_file = PathBuf::from(log_file);
        }
        Ok(())
    }

    /// Load from file, then apply the process environment (including `.env`)
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = Self::load(path)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }
}
