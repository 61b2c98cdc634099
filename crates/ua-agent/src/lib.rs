//! Usage agent library.
//!
//! This crate wires the platform probe, the sampling engine and the collector
//! client into the `usage-agent` binary.

pub mod agent;
mod cli;
mod config;
pub mod identity;

pub use cli::Cli;
pub use config::Config;
