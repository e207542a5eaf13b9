use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use research_writer::config::AppConfig;
use research_writer::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "research-writer")]
#[command(version, about = "Research dashboard that drives an AI agent CLI through literature review phases")]
pub struct Cli {
    /// Project root containing corpus/, outputs/, prompts/ and friends
    #[arg(long, global = true, env = "RESEARCH_WRITER_ROOT")]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dashboard web server
    Serve {
        /// Port to serve on (overrides research-writer.toml)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind (overrides research-writer.toml)
        #[arg(long)]
        host: Option<String>,

        /// Open the dashboard in a browser once the server is up
        #[arg(long)]
        open: bool,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Create the project directories and a default research-writer.toml
    Init,
    /// Show the research phases and which are complete
    Phases,
    /// Ask an agent CLI which tools it has
    Check {
        /// gemini or claude (defaults to agent.default_provider)
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Run a phase prompt through an agent and stream its output
    Run {
        /// Prompt path, e.g. quick-start/phase1.md
        prompt: String,

        /// gemini or claude (defaults to agent.default_provider)
        #[arg(short, long)]
        provider: Option<String>,

        /// Let the agent act without asking for permission
        #[arg(long)]
        yolo: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate research-writer.toml
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let root = match cli.root.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // `init` and `config` cope with a broken config file themselves.
    let config = AppConfig::resolve(&root);
    let log_dir = config.as_ref().ok().and_then(|c| c.log_dir(&root));
    let _log_guard = logging::init_logging(cli.verbose, cli.log_json, log_dir.as_deref())?;

    match &cli.command {
        Commands::Serve {
            port,
            host,
            open,
            dev,
        } => {
            cmd::cmd_serve(root, config?, *port, host.clone(), *open, *dev).await?;
        }
        Commands::Init => cmd::cmd_init(&root)?,
        Commands::Phases => cmd::cmd_phases(&root)?,
        Commands::Check { provider } => {
            cmd::cmd_check(&root, &config?, provider.as_deref()).await?;
        }
        Commands::Run {
            prompt,
            provider,
            yolo,
        } => {
            cmd::cmd_run(&root, &config?, prompt, provider.as_deref(), *yolo).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&root, config, command.clone())?,
    }

    Ok(())
}
