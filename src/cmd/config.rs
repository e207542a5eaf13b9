//! Configuration view and validation commands: `research-writer config`.

use std::path::Path;

use anyhow::{Context, Result};
use research_writer::config::{AppConfig, CONFIG_FILE};
use research_writer::provider::Provider;

use super::super::ConfigCommands;

pub fn cmd_config(
    root: &Path,
    config: Result<AppConfig>,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_path = root.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            let config = config?;
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found; using defaults", CONFIG_FILE);
            }
            println!();
            println!("Effective values (with env overrides):");
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
            println!();
            for provider in Provider::ALL {
                let settings = config.providers.get(provider);
                match provider.resolve_executable(settings) {
                    Ok(path) => println!("  {} -> {}", provider, path.display()),
                    Err(_) => println!("  {} -> not found ({})", provider, provider.command(settings)),
                }
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let config = config.context("Configuration is invalid")?;
            config.validate().context("Configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
