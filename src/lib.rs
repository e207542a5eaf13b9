pub mod agent;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod files;
pub mod logging;
pub mod paths;
pub mod phase;
pub mod provider;
