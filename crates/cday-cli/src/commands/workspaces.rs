//! Workspaces command: lists the workspaces an API key can see.

use std::fmt::Write;

use anyhow::Result;
use cday_core::{ActivityGateway, Workspace};

use super::util;
use crate::Config;

pub const NO_WORKSPACES: &str = "No workspaces found for this API key.";

/// Formats workspaces as one `<id>  <name>` line each.
pub fn format_workspaces(workspaces: &[Workspace]) -> String {
    let mut output = String::new();
    if workspaces.is_empty() {
        writeln!(output, "{NO_WORKSPACES}").unwrap();
        return output;
    }

    let id_width = workspaces
        .iter()
        .map(|workspace| workspace.id.as_str().len())
        .max()
        .unwrap_or(0);
    for workspace in workspaces {
        writeln!(
            output,
            "{:<id_width$}  {}",
            workspace.id.as_str(),
            workspace.name
        )
        .unwrap();
    }
    output
}

pub fn format_workspaces_json(workspaces: &[Workspace]) -> Result<String> {
    Ok(serde_json::to_string_pretty(workspaces)?)
}

/// Runs the workspaces command.
pub fn run(config: &Config, api_key_override: Option<&str>, json: bool) -> Result<()> {
    let api_key = util::require_api_key(api_key_override, config)?;
    let client = util::build_client(config)?;

    let workspaces = util::runtime()?
        .block_on(client.list_workspaces(&api_key))
        .map_err(|err| util::gateway_failure(&err))?;
    tracing::debug!(count = workspaces.len(), "listed workspaces");

    if json {
        println!("{}", format_workspaces_json(&workspaces)?);
    } else {
        print!("{}", format_workspaces(&workspaces));
    }

    Ok(())
}
