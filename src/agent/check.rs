use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::config::ProviderSettings;
use crate::provider::Provider;

pub const TOOL_CHECK_PROMPT: &str =
    "List all available tools you have access to. Respond with just the tool names, one per line.";

const TOOL_KEYWORDS: &[&str] = &[
    "bash",
    "shell",
    "run_shell_command",
    "read",
    "read_file",
    "write",
    "write_file",
    "edit",
    "edit_file",
    "glob",
    "search",
    "grep",
    "search_file_content",
];

const SHELL_KEYWORDS: &[&str] = &["bash", "shell", "run_shell_command"];

const REQUIRED_KEYWORDS: &[&str] = &[
    "bash",
    "run_shell_command",
    "read",
    "write",
    "edit",
    "glob",
    "grep",
];

const MAX_RAW_ERROR_CHARS: usize = 500;

/// Result of probing an agent CLI for its tool capabilities.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderCheck {
    pub provider: Provider,
    pub available: bool,
    pub installed: bool,
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_shell_capability: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_required_tools: Option<bool>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
}

impl ProviderCheck {
    fn not_installed(provider: Provider) -> Self {
        Self {
            provider,
            available: false,
            installed: false,
            tools: Vec::new(),
            has_shell_capability: None,
            has_required_tools: None,
            message: format!("{provider} CLI is not installed or not in your PATH"),
            recommendation: Some(provider.install_hint().to_string()),
            raw_error: None,
        }
    }
}

/// Tool keywords mentioned anywhere in `output`, in keyword order.
pub fn detect_tools(output: &str) -> Vec<String> {
    let lower = output.to_lowercase();
    TOOL_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

/// Build the check report from detected tools and captured stderr.
pub fn summarize(provider: Provider, tools: Vec<String>, raw_error: Option<String>) -> ProviderCheck {
    let matches_any = |keywords: &[&str]| {
        tools
            .iter()
            .any(|tool| keywords.iter().any(|k| tool.contains(k)))
    };
    let has_shell = matches_any(SHELL_KEYWORDS);
    let has_required = matches_any(REQUIRED_KEYWORDS);

    let (message, recommendation) = if provider == Provider::Gemini && !has_shell {
        (
            "Gemini CLI found but may lack shell command execution capability".to_string(),
            Some(
                "Install the 'conductor' extension for Gemini to enable file operations and shell commands, or switch to Claude CLI"
                    .to_string(),
            ),
        )
    } else if has_shell {
        (
            format!("{provider} CLI is properly configured with all required tools"),
            None,
        )
    } else {
        (
            format!("{provider} CLI found but tool capabilities could not be verified"),
            Some(
                "Tool detection inconclusive. Try running a phase to verify functionality."
                    .to_string(),
            ),
        )
    };

    ProviderCheck {
        provider,
        available: true,
        installed: true,
        tools,
        has_shell_capability: Some(has_shell),
        has_required_tools: Some(has_required),
        message,
        recommendation,
        raw_error,
    }
}

/// Ask the provider to list its tools and report what it can do.
///
/// Never fails: an unresolvable CLI yields an `installed: false` report and
/// spawn errors or timeouts end up in `raw_error`.
pub async fn check_provider(
    provider: Provider,
    settings: &ProviderSettings,
    timeout: Duration,
    working_dir: &Path,
) -> ProviderCheck {
    let program = match provider.resolve_executable(settings) {
        Ok(program) => program,
        Err(e) => {
            tracing::info!(%provider, error = %e, "provider check: CLI not found");
            return ProviderCheck::not_installed(provider);
        }
    };

    match probe(&program, &provider.args(settings, false), timeout, working_dir).await {
        Ok((stdout, stderr)) => {
            let tools = detect_tools(&stdout);
            tracing::info!(%provider, tools = ?tools, "provider check finished");
            let raw_error = (!stderr.trim().is_empty())
                .then(|| stderr.chars().take(MAX_RAW_ERROR_CHARS).collect());
            summarize(provider, tools, raw_error)
        }
        Err(ProbeError::TimedOut) => {
            tracing::warn!(%provider, timeout_secs = timeout.as_secs(), "provider check timed out");
            summarize(provider, Vec::new(), Some("Tool check timed out".to_string()))
        }
        Err(ProbeError::Io(e)) => {
            tracing::warn!(%provider, error = %e, "provider check failed to run");
            ProviderCheck {
                available: false,
                raw_error: Some(e.to_string()),
                ..summarize(provider, Vec::new(), None)
            }
        }
    }
}

enum ProbeError {
    TimedOut,
    Io(std::io::Error),
}

async fn probe(
    program: &Path,
    args: &[String],
    timeout: Duration,
    working_dir: &Path,
) -> Result<(String, String), ProbeError> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .env("NO_COLOR", "1")
        .env("FORCE_COLOR", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ProbeError::Io)?;

    let mut stdin = child.stdin.take();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let run = async {
        if let Some(mut stdin) = stdin.take() {
            // A CLI that exits without reading is not an error here.
            let _ = stdin.write_all(TOOL_CHECK_PROMPT.as_bytes()).await;
        }
        let mut out = Vec::new();
        let mut err = Vec::new();
        let read_out = async {
            if let Some(s) = stdout.as_mut() {
                let _ = s.read_to_end(&mut out).await;
            }
        };
        let read_err = async {
            if let Some(s) = stderr.as_mut() {
                let _ = s.read_to_end(&mut err).await;
            }
        };
        tokio::join!(read_out, read_err);
        child.wait().await.map_err(ProbeError::Io)?;
        Ok::<_, ProbeError>((
            String::from_utf8_lossy(&out).into_owned(),
            String::from_utf8_lossy(&err).into_owned(),
        ))
    };

    tokio::time::timeout(timeout, run)
        .await
        .unwrap_or(Err(ProbeError::TimedOut))
}
