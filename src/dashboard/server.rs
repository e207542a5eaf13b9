use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::embedded::Assets;
use crate::config::AppConfig;

/// Where and how the dashboard listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 3141,
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    /// Address to bind; dev mode listens on all interfaces.
    pub fn bind_addr(&self) -> String {
        let host = if self.dev_mode { "0.0.0.0" } else { &self.host };
        format!("{}:{}", host, self.port)
    }
}

/// Build the full application router with the API and SPA serving.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router(&state.config.limits)
        .fallback(static_handler)
        .with_state(state)
}

/// Serve embedded static files or fall back to index.html for SPA routing.
async fn static_handler(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty()
        && let Some(content) = Assets::get(path)
    {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return (
            [(header::CONTENT_TYPE, mime.to_string())],
            Body::from(content.data.into_owned()),
        )
            .into_response();
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).into_owned()).into_response(),
        None => (StatusCode::NOT_FOUND, "Dashboard UI not found").into_response(),
    }
}

/// Start the dashboard and serve until Ctrl+C.
pub async fn start_server(config: ServerConfig, app_config: AppConfig) -> Result<()> {
    let root = config
        .root
        .canonicalize()
        .with_context(|| format!("Project root not found: {}", config.root.display()))?;

    let state = Arc::new(AppState {
        root: root.clone(),
        config: app_config,
    });

    let mut app = build_router(state).layer(TraceLayer::new_for_http());
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr: SocketAddr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, root = %root.display(), dev = config.dev_mode, "dashboard listening");
    println!("Research dashboard running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
