//! Driving an external agent CLI through a research phase.
//!
//! | Module   | Responsibility                                              |
//! |----------|-------------------------------------------------------------|
//! | `runner` | Spawn the agent, relay stdout/stderr, timeout, cancellation |
//! | `check`  | Probe a provider for the tools it exposes                   |
//! | `decode` | Chunk-safe UTF-8 decoding of process output                 |

pub mod check;
pub mod decode;
pub mod runner;

use std::path::Path;

pub use check::{ProviderCheck, check_provider};
pub use runner::{AgentProcess, RunOutcome, RunRequest, RunState};

use crate::config::AppConfig;
use crate::errors::AgentError;
use crate::files::{ContentLimits, read_text};
use crate::paths::PROMPT_DIRS;
use crate::provider::Provider;

/// What a caller asks for when starting a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub prompt_path: String,
    /// `None` selects the configured default provider
    pub provider: Option<Provider>,
    pub yolo: bool,
}

/// Validate a run and assemble everything needed to spawn it.
///
/// Nothing is spawned here, so every failure can still be reported as a
/// plain error response.
pub async fn prepare_run(
    root: &Path,
    config: &AppConfig,
    params: RunParams,
) -> Result<RunRequest, AgentError> {
    let provider = match params.provider {
        Some(provider) => provider,
        None => config
            .default_provider()
            .map_err(|_| AgentError::InvalidProvider(config.agent.default_provider.clone()))?,
    };

    let prompt = read_text(
        root,
        &params.prompt_path,
        PROMPT_DIRS,
        ContentLimits::from(&config.limits),
    )
    .await?;

    let settings = config.providers.get(provider);
    let program = provider.resolve_executable(settings)?;

    Ok(RunRequest {
        provider,
        program,
        args: provider.args(settings, params.yolo),
        prompt: prompt.content,
        prompt_path: prompt.path,
        working_dir: root.to_path_buf(),
        timeout: config.agent.timeout(),
    })
}
