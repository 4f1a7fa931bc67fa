//! Report command for the daily activity report.
//!
//! This module implements `cday report`: it validates the request, fans out
//! over the workspace roster and renders the result as text or JSON.

use std::fmt::Write;
use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use cday_core::duration::UNKNOWN;
use cday_core::{
    AggregatorOptions, CancellationToken, FormattedEntry, ProgressEvent, Report,
    ReportAggregator, ReportRequest, UserReport,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::util;
use crate::{Config, ReportArgs};

pub const NO_ACTIVE_USERS: &str = "No active users found in this workspace.";
pub const NO_CHECKABLE_USERS: &str =
    "No users checked: every active user was skipped due to incomplete data.";

/// Builds a validated request from arguments, falling back to configuration.
pub fn build_request(
    args: &ReportArgs,
    config: &Config,
    api_key_override: Option<&str>,
) -> Result<ReportRequest> {
    let api_key = util::require_api_key(api_key_override, config)?;
    let Some(workspace_id) = args.workspace.as_deref().or(config.workspace_id.as_deref()) else {
        anyhow::bail!(
            "No workspace selected. Pass --workspace or set workspace_id (run 'cday workspaces' to list them)"
        );
    };
    let timezone = args.timezone.as_deref().unwrap_or(&config.timezone);

    let mut request = ReportRequest::new(
        api_key.expose(),
        workspace_id,
        args.days_back,
        timezone,
    )?;

    let display = args
        .display_timezone
        .as_deref()
        .or(config.display_timezone.as_deref());
    if let Some(display_timezone) = util::resolve_display_timezone(display)? {
        request = request.with_display_timezone(display_timezone);
    }
    Ok(request)
}

// ========== Text Output ==========

fn entry_line(formatted: &FormattedEntry) -> String {
    let entry = &formatted.entry;
    let description = entry.description.as_deref().unwrap_or(UNKNOWN);
    let project = match (&entry.project_name, &entry.client_name) {
        (Some(project), Some(client)) => format!("{project} ({client})"),
        (Some(project), None) => project.clone(),
        (None, _) => UNKNOWN.to_string(),
    };
    let task = entry.task_name.as_deref().unwrap_or(UNKNOWN);
    format!(
        "{description} | {project} | {task} | {} | {} | {}",
        formatted.display_start, formatted.display_end, formatted.display_duration
    )
}

fn format_user(output: &mut String, user_report: &UserReport, date: &str) {
    let user = &user_report.user;
    writeln!(output, "USER: {} (ID: {})", user.name, user.id.as_str()).unwrap();

    if let Some(err) = &user_report.fetch_error {
        writeln!(output, "  Error: {}", err.user_message()).unwrap();
    } else if !user_report.has_entries {
        writeln!(output, "  No time entries found for {} on {date}.", user.name).unwrap();
    } else {
        writeln!(output, "  Desc. | Project (Client) | Task | Start | End | Duration").unwrap();
        for entry in &user_report.entries {
            writeln!(output, "  {}", entry_line(entry)).unwrap();
        }
    }
}

/// Formats the human-readable report output.
pub fn format_report(report: &Report) -> String {
    let mut output = String::new();
    let date = report.window.local_date.format("%Y-%m-%d").to_string();

    // Header
    writeln!(
        output,
        "REPORT: {date} ({}, {})",
        report.window.day_label,
        report.window.timezone.name()
    )
    .unwrap();
    writeln!(output, "Workspace: {}", report.workspace_name).unwrap();
    if report.display_timezone != report.window.timezone {
        writeln!(output, "Times shown in {}", report.display_timezone.name()).unwrap();
    }

    if !report.notices.is_empty() {
        writeln!(output).unwrap();
        for notice in &report.notices {
            writeln!(output, "Warning: {}", notice.message()).unwrap();
        }
    }

    if report.roster_size == 0 {
        writeln!(output).unwrap();
        writeln!(output, "{NO_ACTIVE_USERS}").unwrap();
        return output;
    }

    for user_report in &report.user_reports {
        writeln!(output).unwrap();
        format_user(&mut output, user_report, &date);
    }

    writeln!(output).unwrap();
    if !report.complete {
        let expected = report.roster_size - skipped_count(report);
        writeln!(
            output,
            "Report incomplete: cancelled after checking {} of {expected} users.",
            report.user_reports.len()
        )
        .unwrap();
    } else if report.user_reports.is_empty() {
        writeln!(output, "{NO_CHECKABLE_USERS}").unwrap();
    } else if report.is_all_clear() {
        writeln!(
            output,
            "All active users checked. No time entries recorded on {date}."
        )
        .unwrap();
    } else {
        let failed = report.failed_users().count();
        if failed > 0 {
            writeln!(output, "Could not fetch time entries for {failed} user(s).").unwrap();
        } else {
            let with_entries = report.user_reports.iter().filter(|u| u.has_entries).count();
            writeln!(
                output,
                "{with_entries} of {} users recorded time on {date}.",
                report.user_reports.len()
            )
            .unwrap();
        }
    }

    output
}

fn skipped_count(report: &Report) -> usize {
    report
        .notices
        .iter()
        .filter(|notice| matches!(notice, cday_core::ReportNotice::UserSkipped { .. }))
        .count()
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: String,
    pub date: String,
    pub day_label: &'a str,
    pub timezone: &'static str,
    pub display_timezone: &'static str,
    pub window: JsonWindow,
    pub workspace: JsonWorkspace<'a>,
    pub complete: bool,
    pub any_actions_found: bool,
    pub all_clear: bool,
    pub notices: Vec<&'static str>,
    pub users: Vec<JsonUser<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonWindow {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct JsonWorkspace<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct JsonUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub has_entries: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub entries: &'a [FormattedEntry],
}

/// Formats a report as JSON.
pub fn format_report_json(report: &Report, generated_at: DateTime<Utc>) -> Result<String> {
    let json = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        date: report.window.local_date.format("%Y-%m-%d").to_string(),
        day_label: &report.window.day_label,
        timezone: report.window.timezone.name(),
        display_timezone: report.display_timezone.name(),
        window: JsonWindow {
            start: report.window.start_param(),
            end: report.window.end_param(),
        },
        workspace: JsonWorkspace {
            id: report.workspace_id.as_str(),
            name: &report.workspace_name,
        },
        complete: report.complete,
        any_actions_found: report.any_actions_found,
        all_clear: report.is_all_clear(),
        notices: report.notices.iter().map(|notice| notice.message()).collect(),
        users: report
            .user_reports
            .iter()
            .map(|user_report| JsonUser {
                id: user_report.user.id.as_str(),
                name: &user_report.user.name,
                has_entries: user_report.has_entries,
                error: user_report.fetch_error.as_ref().map(|err| err.user_message()),
                entries: &user_report.entries,
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&json)?)
}

// ========== Public Interface ==========

/// Returns a progress callback that redraws one stderr line.
fn progress_printer(enabled: bool) -> impl FnMut(ProgressEvent) + Send {
    move |event| {
        if !enabled {
            return;
        }
        match event {
            ProgressEvent::RosterLoaded { total } => eprint!("Checking {total} users..."),
            ProgressEvent::UserFinished {
                finished, total, ..
            } => eprint!("\rChecked {finished}/{total} users"),
            ProgressEvent::UserSkipped { .. } => {}
        }
    }
}

/// Runs the report command.
pub fn run(args: &ReportArgs, config: &Config, api_key_override: Option<&str>) -> Result<()> {
    let request = build_request(args, config, api_key_override)?;
    let client = util::build_client(config)?;
    let aggregator = ReportAggregator::new(Arc::new(client)).with_options(AggregatorOptions {
        concurrency: args.concurrency.unwrap_or(config.concurrency),
        call_timeout: config.request_timeout(),
    });

    let show_progress = !args.json && std::io::stderr().is_terminal();
    let generated_at = Utc::now();
    let cancel = CancellationToken::new();

    let result = util::runtime()?.block_on(async {
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, finishing with partial report");
                on_ctrl_c.cancel();
            }
        });
        aggregator
            .generate_report_with(
                &request,
                generated_at,
                &cancel,
                progress_printer(show_progress),
            )
            .await
    });
    if show_progress {
        eprintln!();
    }

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "report failed");
            anyhow::bail!(err.user_message());
        }
    };

    if args.json {
        let output = format_report_json(&report, generated_at)?;
        println!("{output}");
    } else {
        print!("{}", format_report(&report));
    }

    Ok(())
}
