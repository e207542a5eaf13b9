//! Dashboard server command: `research-writer serve`.

use std::path::PathBuf;

use anyhow::Result;
use research_writer::config::AppConfig;
use research_writer::dashboard::{ServerConfig, start_server};

pub async fn cmd_serve(
    root: PathBuf,
    mut config: AppConfig,
    port: Option<u16>,
    host: Option<String>,
    open: bool,
    dev: bool,
) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    config.validate()?;

    let server = ServerConfig {
        root,
        host: config.server.host.clone(),
        port: config.server.port,
        dev_mode: dev,
    };

    // Skip in dev mode; the browser usually runs elsewhere.
    if open && !dev {
        let url = format!("http://localhost:{}", server.port);
        tokio::spawn(async move {
            // Give the listener a moment to bind.
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, %url, "failed to open browser");
            }
        });
    }

    start_server(server, config).await
}
