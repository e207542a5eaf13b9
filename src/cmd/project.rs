//! Project scaffolding and progress commands: `research-writer init`, `research-writer phases`.

use std::path::Path;

use anyhow::{Context, Result};
use research_writer::config::{AppConfig, CONFIG_FILE};
use research_writer::paths::PROJECT_DIRS;
use research_writer::phase::{self, PHASES};

pub fn cmd_init(root: &Path) -> Result<()> {
    for dir in PROJECT_DIRS {
        let path = root.join(dir);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }

    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        println!("Keeping existing {}", CONFIG_FILE);
        if let Err(e) = AppConfig::load(&config_path) {
            println!("Warning: {e:#}");
        }
    } else {
        AppConfig::default().save(&config_path)?;
        println!("Created {}", CONFIG_FILE);
    }

    println!("Initialized research project at {}", root.display());
    println!();
    println!("Next steps:");
    println!("  1. Add phase prompts to quick-start/ (phase1.md ... phase7.md)");
    println!("  2. Run 'research-writer serve --open' and upload your PDFs");
    Ok(())
}

pub fn cmd_phases(root: &Path) -> Result<()> {
    let status = phase::dashboard_status(root);

    println!();
    println!("Research Phases ({} papers in corpus)", status.corpus_count);
    println!("===============");
    println!();
    for p in PHASES {
        let mark = if status.completed_phases.contains(&p.id) {
            "[x]"
        } else if p.id == status.current_phase {
            "[>]"
        } else {
            "[ ]"
        };
        println!("  {} {:<6} {}", mark, p.id, p.label);
        if let Some(prompt) = p.prompt_file {
            println!("           prompt: {}", prompt);
        }
    }
    println!();
    println!(
        "{}/{} phases complete",
        status.completed_phases.len(),
        PHASES.len()
    );
    if status.all_complete {
        println!("All done: project complete.");
    }
    Ok(())
}
