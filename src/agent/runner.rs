use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use super::decode::Utf8Chunker;
use crate::errors::AgentError;
use crate::provider::Provider;

/// Prefix applied to every chunk read from the agent's stderr.
pub const STDERR_PREFIX: &str = "[Error] ";

const READ_CHUNK: usize = 8 * 1024;

/// How long to wait for output pipes to drain once the process is gone.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to launch one agent process.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub provider: Provider,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Written to the process's stdin, which is then closed
    pub prompt: String,
    /// Relative prompt path, echoed in the banner
    pub prompt_path: String,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl RunRequest {
    /// `program args...` as shown to the user.
    pub fn command_line(&self) -> String {
        let program = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string());
        std::iter::once(program)
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where a run ended up.
///
/// A run that has not started is a [`RunRequest`] and a running one is an
/// [`AgentProcess`]; consuming the process with [`AgentProcess::stream`]
/// yields one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Finished,
    Killed,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own; `None` when it died from a signal.
    Exited { code: Option<i32> },
    /// The wall-clock limit elapsed and the process was killed.
    TimedOut,
    /// The consumer went away and the process was killed.
    Cancelled,
}

impl RunOutcome {
    pub fn final_state(&self) -> RunState {
        match self {
            RunOutcome::Exited { .. } => RunState::Finished,
            RunOutcome::TimedOut | RunOutcome::Cancelled => RunState::Killed,
        }
    }
}

/// A spawned agent process whose output has not been consumed yet.
pub struct AgentProcess {
    id: Uuid,
    request: RunRequest,
    child: Child,
}

impl AgentProcess {
    /// Spawn the agent with piped stdio. Nothing is written to it yet.
    pub fn spawn(request: RunRequest) -> Result<Self, AgentError> {
        let id = Uuid::new_v4();
        let child = Command::new(&request.program)
            .args(&request.args)
            .current_dir(&request.working_dir)
            .env("NO_COLOR", "1")
            .env("FORCE_COLOR", "0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::SpawnFailed {
                command: request.program.display().to_string(),
                source,
            })?;

        tracing::info!(
            run_id = %id,
            provider = %request.provider,
            pid = child.id(),
            command = %request.command_line(),
            prompt = %request.prompt_path,
            "agent process started"
        );

        Ok(Self { id, request, child })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Feed the prompt, relay output into `tx` and wait for the process to end.
    ///
    /// Dropping the receiving side of `tx` cancels the run.
    pub async fn stream(mut self, tx: mpsc::Sender<String>) -> Result<RunOutcome, AgentError> {
        let span = tracing::info_span!("agent_run", run_id = %self.id, provider = %self.request.provider);
        self.drive(&tx).instrument(span).await
    }

    fn banner(&self) -> Vec<String> {
        vec![
            format!(
                "[System] Starting {} Agent...\n",
                self.request.provider.display_name()
            ),
            format!("[System] Reading prompt: {}\n", self.request.prompt_path),
            format!("[System] Executing: {}\n\n", self.request.command_line()),
        ]
    }

    async fn drive(&mut self, tx: &mpsc::Sender<String>) -> Result<RunOutcome, AgentError> {
        for line in self.banner() {
            if tx.send(line).await.is_err() {
                return Ok(self.finish_killed(RunOutcome::Cancelled).await);
            }
        }

        let stdin = self.child.stdin.take();
        let prompt = std::mem::take(&mut self.request.prompt);
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    tracing::debug!(error = %e, "agent closed stdin before reading the prompt");
                }
                // Dropping stdin closes the pipe so the agent sees EOF.
            }
        });

        let readers: Vec<_> = [
            self.child
                .stdout
                .take()
                .map(|out| tokio::spawn(relay(out, tx.clone(), ""))),
            self.child
                .stderr
                .take()
                .map(|err| tokio::spawn(relay(err, tx.clone(), STDERR_PREFIX))),
        ]
        .into_iter()
        .flatten()
        .collect();

        let outcome = tokio::select! {
            status = self.child.wait() => {
                let status = status.map_err(AgentError::WaitFailed)?;
                RunOutcome::Exited { code: status.code() }
            }
            _ = tokio::time::sleep(self.request.timeout) => RunOutcome::TimedOut,
            _ = tx.closed() => RunOutcome::Cancelled,
        };

        if outcome.final_state() == RunState::Killed {
            self.kill().await;
        }
        stdin_task.abort();

        for mut reader in readers {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
                tracing::warn!("agent output pipe still open after exit; abandoning it");
                reader.abort();
            }
        }

        let trailer = match outcome {
            RunOutcome::Exited { code } => Some(format!(
                "\n[System] Process finished with exit code {}\n",
                code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )),
            RunOutcome::TimedOut => Some(format!(
                "\n[System] Execution timed out after {} seconds. Process terminated.\n",
                self.request.timeout.as_secs()
            )),
            RunOutcome::Cancelled => None,
        };
        if let Some(trailer) = trailer {
            let _ = tx.send(trailer).await;
        }

        match outcome {
            RunOutcome::Exited { code } => tracing::info!(?code, "agent process finished"),
            RunOutcome::TimedOut => tracing::warn!(
                timeout_secs = self.request.timeout.as_secs(),
                "agent process timed out and was killed"
            ),
            RunOutcome::Cancelled => tracing::info!("client disconnected; agent process killed"),
        }
        Ok(outcome)
    }

    async fn finish_killed(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.kill().await;
        tracing::info!(?outcome, "agent run ended before output started");
        outcome
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "failed to kill agent process");
        }
    }
}

/// Copy `reader` into `tx` chunk by chunk until EOF or until nobody listens.
async fn relay<R>(mut reader: R, tx: mpsc::Sender<String>, prefix: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut decoder = Utf8Chunker::default();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "agent output read failed");
                break;
            }
        };
        let text = decoder.push(&buf[..n]);
        if text.is_empty() {
            continue;
        }
        if tx.send(format!("{prefix}{text}")).await.is_err() {
            return;
        }
    }
    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(format!("{prefix}{rest}")).await;
    }
}
