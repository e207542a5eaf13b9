//! Configuration for the research dashboard, read from `research-writer.toml`.
//!
//! Layering is file → environment → CLI. Every section is optional and falls
//! back to the defaults shown here.
//!
//! ```toml
//! [server]
//! port = 3141
//! host = "127.0.0.1"
//!
//! [limits]
//! max_upload_bytes = 52428800
//! max_content_bytes = 10485760
//! max_path_length = 500
//!
//! [agent]
//! default_provider = "gemini"
//! timeout_secs = 600
//! check_timeout_secs = 10
//!
//! [providers.gemini]
//! command = "gemini"
//! args = []
//!
//! [providers.claude]
//! command = "claude"
//!
//! [logging]
//! dir = ".research-writer/logs"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::paths::MAX_PATH_LENGTH;
use crate::provider::Provider;

/// Name of the configuration file in the project root.
pub const CONFIG_FILE: &str = "research-writer.toml";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3141
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Size caps applied to uploads, content reads/writes and paths.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LimitsSection {
    /// Maximum PDF upload size (default 50 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Maximum size of a file read or written through the content API (default 10 MiB)
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,
    /// Maximum length of a user-supplied relative path
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_max_content_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_path_length() -> usize {
    MAX_PATH_LENGTH
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_content_bytes: default_max_content_bytes(),
            max_path_length: default_max_path_length(),
        }
    }
}

/// Agent run settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Wall-clock limit for a single agent run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Wall-clock limit for the provider tool check
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
}

fn default_provider() -> String {
    Provider::default().as_str().to_string()
}

fn default_timeout_secs() -> u64 {
    10 * 60
}

fn default_check_timeout_secs() -> u64 {
    10
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            check_timeout_secs: default_check_timeout_secs(),
        }
    }
}

impl AgentSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

/// Per-provider command override.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    /// Executable name or path (default: the provider name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Extra arguments placed before the provider-specific flags
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProvidersSection {
    #[serde(default)]
    pub gemini: ProviderSettings,
    #[serde(default)]
    pub claude: ProviderSettings,
}

impl ProvidersSection {
    pub fn get(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::Claude => &self.claude,
        }
    }

    pub fn get_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::Claude => &mut self.claude,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// Directory for daily rolling log files, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// The complete `research-writer.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub providers: ProvidersSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse research-writer.toml")
    }

    /// Load `research-writer.toml` from the project root, or defaults when absent.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from the project root and apply environment overrides.
    pub fn resolve(root: &Path) -> Result<Self> {
        let mut config = Self::load_or_default(root)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `GEMINI_CMD`, `CLAUDE_CMD` and `RESEARCH_WRITER_PORT`.
    ///
    /// Environment commands only fill in providers the file leaves unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for provider in Provider::ALL {
            let settings = self.providers.get_mut(provider);
            if settings.command.is_none() {
                settings.command = lookup(provider.env_var());
            }
        }
        if let Some(port) = lookup("RESEARCH_WRITER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize research-writer.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// The provider used when a request does not specify one.
    pub fn default_provider(&self) -> Result<Provider, ConfigError> {
        self.agent
            .default_provider
            .parse()
            .map_err(|_| ConfigError::UnknownProvider(self.agent.default_provider.clone()))
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Zero { field: "server.port" });
        }
        if self.server.host.trim().is_empty() || self.server.host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidHost(self.server.host.clone()));
        }
        let limits = [
            ("limits.max_upload_bytes", self.limits.max_upload_bytes),
            ("limits.max_content_bytes", self.limits.max_content_bytes),
            ("limits.max_path_length", self.limits.max_path_length as u64),
            ("agent.timeout_secs", self.agent.timeout_secs),
            ("agent.check_timeout_secs", self.agent.check_timeout_secs),
        ];
        if let Some(&(field, _)) = limits.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }
        self.default_provider()?;
        Ok(())
    }

    /// Absolute log directory, when file logging is configured.
    pub fn log_dir(&self, root: &Path) -> Option<PathBuf> {
        self.logging.dir.as_ref().map(|dir| root.join(dir))
    }
}
