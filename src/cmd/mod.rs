//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled      |
//! |-----------|-----------------------|
//! | `serve`   | `Serve`               |
//! | `project` | `Init`, `Phases`      |
//! | `agent`   | `Check`, `Run`        |
//! | `config`  | `Config`              |

pub mod agent;
pub mod config;
pub mod project;
pub mod serve;

pub use agent::{cmd_check, cmd_run};
pub use config::cmd_config;
pub use project::{cmd_init, cmd_phases};
pub use serve::cmd_serve;
