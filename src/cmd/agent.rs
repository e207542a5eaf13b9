//! Agent commands: `research-writer check` and `research-writer run`.

use std::path::Path;

use anyhow::{Result, bail};
use research_writer::agent::{self, AgentProcess, RunOutcome, RunParams};
use research_writer::config::AppConfig;
use research_writer::provider::Provider;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

fn resolve_provider(config: &AppConfig, name: Option<&str>) -> Result<Provider> {
    Ok(match name {
        Some(name) => name.parse()?,
        None => config.default_provider()?,
    })
}

pub async fn cmd_check(root: &Path, config: &AppConfig, provider: Option<&str>) -> Result<()> {
    let provider = resolve_provider(config, provider)?;
    println!("Checking {} CLI...", provider);

    let check = agent::check_provider(
        provider,
        config.providers.get(provider),
        config.agent.check_timeout(),
        root,
    )
    .await;

    println!();
    println!("  installed: {}", check.installed);
    if !check.tools.is_empty() {
        println!("  tools:     {}", check.tools.join(", "));
    }
    println!("  {}", check.message);
    if let Some(recommendation) = &check.recommendation {
        println!("  {}", recommendation);
    }
    if let Some(raw) = &check.raw_error {
        println!();
        println!("  stderr: {}", raw.trim());
    }

    if !check.installed {
        bail!("{} CLI is not available", provider);
    }
    Ok(())
}

/// Stream one agent run to stdout. Ctrl+C stops the agent.
pub async fn cmd_run(
    root: &Path,
    config: &AppConfig,
    prompt: &str,
    provider: Option<&str>,
    yolo: bool,
) -> Result<()> {
    let params = RunParams {
        prompt_path: prompt.to_string(),
        provider: provider.map(str::parse::<Provider>).transpose()?,
        yolo,
    };
    let request = agent::prepare_run(root, config, params).await?;
    let process = AgentProcess::spawn(request)?;

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let handle = tokio::spawn(process.stream(tx));

    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(text) => {
                    stdout.write_all(text.as_bytes()).await?;
                    stdout.flush().await?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nStopping agent...");
                break;
            }
        }
    }
    // Closing the channel tells the runner to kill the process.
    drop(rx);

    match handle.await?? {
        RunOutcome::Exited { code: Some(0) } => Ok(()),
        RunOutcome::Exited { code } => bail!(
            "Agent exited with code {}",
            code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
        ),
        RunOutcome::TimedOut => bail!("Agent timed out"),
        RunOutcome::Cancelled => bail!("Agent run cancelled"),
    }
}
