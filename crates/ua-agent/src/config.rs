//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ua_core::{SchedulerConfig, ValidationError};
use ua_report::{ClientOptions, DEFAULT_API_KEY_HEADER};

const REDACTED: &str = "[REDACTED]";

/// Agent configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collector URL receiving one POST per flush. Must be `https`.
    pub endpoint: String,

    /// Static key sent with every report.
    pub api_key: Option<String>,

    /// Header name carrying `api_key`.
    pub api_key_header: String,

    /// Seconds between samples; also the credit per recorded sample.
    pub sample_interval_secs: u64,

    /// Seconds between flushes.
    pub flush_interval_secs: u64,

    /// Seconds without input after which the user counts as idle.
    pub idle_threshold_secs: u64,

    /// Upper bound on a single report request.
    pub request_timeout_secs: u64,

    /// Reporting identity. Defaults to the machine's hostname.
    pub identity: Option<String>,

    /// Whether reports carry the identity envelope at all.
    pub include_identity: bool,

    /// Send the partial batch once more when shutting down.
    pub flush_on_shutdown: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("api_key_header", &self.api_key_header)
            .field("sample_interval_secs", &self.sample_interval_secs)
            .field("flush_interval_secs", &self.flush_interval_secs)
            .field("idle_threshold_secs", &self.idle_threshold_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("identity", &self.identity)
            .field("include_identity", &self.include_identity)
            .field("flush_on_shutdown", &self.flush_on_shutdown)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:32768/api/userappusage/".to_string(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            sample_interval_secs: 10,
            flush_interval_secs: 60,
            idle_threshold_secs: 60,
            request_timeout_secs: 30,
            identity: None,
            include_identity: true,
            flush_on_shutdown: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (UA_*)
        figment = figment.merge(Env::prefixed("UA_"));

        figment.extract()
    }

    /// Timing settings for the scheduler.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ValidationError> {
        SchedulerConfig::new(
            Duration::from_secs(self.sample_interval_secs),
            Duration::from_secs(self.flush_interval_secs),
            Duration::from_secs(self.idle_threshold_secs),
        )
    }

    /// Options for the collector client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_key_header: self.api_key_header.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// The configured API key.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("no API key configured; set `api_key` in config.toml or UA_API_KEY")
    }

    /// Checks the settings that do not need a client or probe to validate.
    pub fn validate(&self) -> Result<()> {
        self.scheduler_config()
            .context("invalid sampling configuration")?;
        self.api_key()?;
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// A copy safe to print, with the API key replaced.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.as_ref().map(|_| REDACTED.to_string()),
            ..self.clone()
        }
    }
}

/// Returns the platform-specific config directory for the agent.
///
/// On Linux: `~/.config/usage-agent`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("usage-agent"))
}
