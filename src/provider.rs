//! The external agent CLIs the dashboard can drive.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::errors::AgentError;

/// An interchangeable agent command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Claude,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Gemini, Provider::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
        }
    }

    /// Capitalized name for log banners.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Claude => "Claude",
        }
    }

    /// Environment variable that overrides the command.
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_CMD",
            Provider::Claude => "CLAUDE_CMD",
        }
    }

    /// The configured command, or the provider name.
    pub fn command<'a>(&self, settings: &'a ProviderSettings) -> &'a str {
        settings.command.as_deref().unwrap_or(self.as_str())
    }

    /// Arguments for a run: configured extras first, then provider flags.
    ///
    /// The prompt always arrives on stdin, so Claude is put in `--print` mode.
    pub fn args(&self, settings: &ProviderSettings, yolo: bool) -> Vec<String> {
        let mut args = settings.args.clone();
        match self {
            Provider::Gemini => {
                if yolo {
                    args.push("--yolo".to_string());
                }
            }
            Provider::Claude => {
                args.push("--print".to_string());
                if yolo {
                    args.push("--dangerously-skip-permissions".to_string());
                }
            }
        }
        args
    }

    /// Install hint shown when the executable cannot be found.
    pub fn install_hint(&self) -> &'static str {
        match self {
            Provider::Gemini => "Install Gemini CLI: npm install -g @google/gemini-cli",
            Provider::Claude => "Install Claude CLI: npm install -g @anthropic-ai/claude-code",
        }
    }

    /// Locate the executable for this provider.
    pub fn resolve_executable(&self, settings: &ProviderSettings) -> Result<PathBuf, AgentError> {
        let command = self.command(settings);
        find_executable(command, &self.fallback_locations()).ok_or_else(|| {
            AgentError::NotInstalled {
                provider: self.as_str().to_string(),
                command: command.to_string(),
            }
        })
    }

    /// Install locations checked when the command is not on `PATH`.
    fn fallback_locations(&self) -> Vec<PathBuf> {
        let mut locations = Vec::new();
        if let Some(home) = dirs::home_dir() {
            if *self == Provider::Claude {
                locations.push(home.join(".claude/local"));
            }
            locations.push(home.join(".local/bin"));
            locations.push(home.join(".npm-global/bin"));
        }
        locations.push(PathBuf::from("/usr/local/bin"));
        locations.push(PathBuf::from("/opt/homebrew/bin"));
        locations
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "claude" => Ok(Provider::Claude),
            _ => Err(AgentError::InvalidProvider(s.to_string())),
        }
    }
}

/// Resolve `command` to an executable path.
///
/// Commands containing a path separator are taken literally; bare names are
/// looked up on `PATH` and then in `fallback_dirs`.
pub fn find_executable(command: &str, fallback_dirs: &[PathBuf]) -> Option<PathBuf> {
    if command.trim().is_empty() {
        return None;
    }
    if command.contains(['/', '\\']) {
        let path = Path::new(command);
        return path.is_file().then(|| path.to_path_buf());
    }
    if let Ok(path) = which::which(command) {
        return Some(path);
    }
    fallback_dirs
        .iter()
        .map(|dir| dir.join(command))
        .find(|path| path.is_file())
}
