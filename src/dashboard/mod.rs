//! Research dashboard: HTTP back-end and embedded browser UI.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │ Browser  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ (ui/)    │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘ text/    │         │                                        │
//!              plain    │         │ files::*      corpus, content         │
//!              stream   │         │ phase::*      dashboard status        │
//!                       │         │ agent::prepare_run()                   │
//!                       │         v                                        │
//!                       │  agent::AgentProcess::stream()  ──> mpsc ──> body │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! | Module     | Responsibility                                     |
//! |------------|----------------------------------------------------|
//! | `api`      | JSON handlers, `ApiError` status mapping           |
//! | `server`   | Router assembly, static assets, bind and shutdown  |
//! | `embedded` | `rust-embed` bundle of `ui/`                       |

pub mod api;
pub mod embedded;
pub mod server;

pub use api::{AppState, SharedState};
pub use server::{ServerConfig, build_router, start_server};
