//! Clockify day report CLI library.
//!
//! This crate provides the `cday` command-line interface: argument parsing,
//! configuration, and the text and JSON renderings of a report.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ReportArgs};
pub use config::Config;
