//! CLI subcommand implementations.

pub mod report;
pub mod util;
pub mod workspaces;
