//! Output formatting for CLI commands

use crate::error::CliError;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use replica_foundation::{BatchReport, HealthSnapshot, JobStatus};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for automation
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Serialize `value` for the machine-readable formats.
///
/// Returns `None` for [`OutputFormat::Text`]; callers render text themselves.
pub fn serialize<T: Serialize>(
    value: &T,
    format: OutputFormat,
) -> Result<Option<String>, CliError> {
    match format {
        OutputFormat::Text => Ok(None),
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
    }
}

fn status_cell(status: JobStatus, pending: bool) -> Cell {
    let color = match status {
        JobStatus::Ready => Color::Green,
        JobStatus::Created if pending => Color::Yellow,
        JobStatus::TimedOut | JobStatus::Cancelled => Color::Yellow,
        JobStatus::Failed => Color::Red,
        _ => Color::Reset,
    };
    let label = if pending {
        format!("{status} (pending)")
    } else {
        status.to_string()
    };
    Cell::new(label).fg(color)
}

pub fn batch_table(report: &BatchReport) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Kind", "Title", "Status", "Entry", "Polls", "Provider", "Error"]);

    for item in &report.items {
        let kind = if item.simplified {
            format!("{} -> text", item.content_kind)
        } else {
            item.content_kind.to_string()
        };
        match &item.outcome {
            None => {
                table.add_row(vec![
                    Cell::new(item.index + 1),
                    Cell::new(kind),
                    Cell::new(&item.title),
                    Cell::new("SKIPPED").fg(Color::DarkGrey),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(""),
                ]);
            }
            Some(outcome) => {
                let provider = match &outcome.provider_used {
                    Some(p) if outcome.fallback_used => format!("{p} (fallback)"),
                    Some(p) => p.to_string(),
                    None => "-".to_string(),
                };
                let error = outcome
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", e.kind(), e.cause()))
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(item.index + 1),
                    Cell::new(kind),
                    Cell::new(&item.title),
                    status_cell(outcome.final_status, outcome.pending),
                    Cell::new(outcome.entry_id.as_deref().unwrap_or("-")),
                    Cell::new(outcome.attempts_made),
                    Cell::new(provider),
                    Cell::new(error),
                ]);
            }
        }
    }
    table
}

pub fn print_batch(report: &BatchReport, format: OutputFormat) -> Result<(), CliError> {
    if let Some(rendered) = serialize(report, format)? {
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", batch_table(report));
    let summary = format!(
        "{} ready, {} skipped, {} total",
        report.ready_count(),
        report.skipped_count(),
        report.items.len()
    );
    if report.aborted {
        println!("{} {}", summary.yellow(), "(aborted after an authorization failure)".red());
    } else if report.ready_count() == report.items.len() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
    Ok(())
}

pub fn print_health(snapshot: &HealthSnapshot, format: OutputFormat) -> Result<(), CliError> {
    if let Some(rendered) = serialize(snapshot, format)? {
        println!("{rendered}");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Provider", "State", "Failures", "Successes", "Next attempt"]);
    for (provider, status) in &snapshot.breakers {
        table.add_row(vec![
            provider.to_string(),
            status.state.to_string(),
            status.failure_count.to_string(),
            status.success_count.to_string(),
            status
                .next_attempt_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{}", "Circuit breakers".bold());
    println!("{table}");
    for (status, count) in &snapshot.jobs_by_status {
        println!("  {status}: {count}");
    }
    Ok(())
}
