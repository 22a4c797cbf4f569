//! User-facing progress output on stdout.

use std::io::Write;

use tokio::sync::mpsc;
use wspublish_pipeline::{ItemOutcome, ListReport, PipelineEvent};
use wspublish_workshop::{AppId, CloudQuota, PublishedFileDetails};

pub fn banner() -> String {
    format!("Workshop Publishing Tool v{}", wspublish_pipeline::TOOL_TAG)
}

/// Prints events to stdout until every sender is dropped.
pub async fn print_events(rx: mpsc::UnboundedReceiver<PipelineEvent>) {
    render_events(rx, &mut std::io::stdout()).await;
}

/// Writes one line per event. A stage line stays open so the dots of the
/// callback pumps that follow land on it.
async fn render_events<W: Write>(mut rx: mpsc::UnboundedReceiver<PipelineEvent>, out: &mut W) {
    let mut mid_line = false;
    while let Some(event) = rx.recv().await {
        if mid_line && !matches!(event, PipelineEvent::Tick) {
            let _ = writeln!(out);
            mid_line = false;
        }
        let _ = match event {
            PipelineEvent::Tick => {
                mid_line = true;
                write!(out, ".")
            }
            PipelineEvent::StageStarted(stage) => {
                mid_line = true;
                write!(out, "{}", capitalize(&stage.to_string()))
            }
            PipelineEvent::FileAdded(path) => writeln!(out, "  added {path}"),
            PipelineEvent::ItemDeleted(id) => writeln!(out, "Deleted {id}"),
        };
        let _ = out.flush();
    }
    if mid_line {
        let _ = writeln!(out);
    }
}

pub fn quota_line(app_id: AppId, quota: &CloudQuota) -> String {
    format!(
        "Cloud Quota for AppID {app_id}: {} Used, {} Available, {} Total",
        quota.used(),
        quota.available,
        quota.total
    )
}

pub fn item_line(item: &PublishedFileDetails) -> String {
    format!(
        "{}  {}  [{}]  ({})",
        item.id,
        item.title,
        item.tags.join(", "),
        item.visibility
    )
}

pub fn outcome_line(verb: &str, outcome: &ItemOutcome) -> String {
    format!(
        "{verb} {} as {} ({} files, {} bytes)",
        outcome.name, outcome.id, outcome.entry_count, outcome.archive_size
    )
}

pub fn report_lines(report: &ListReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.items.len() + 2);
    match &report.quota {
        Some(quota) => lines.push(quota_line(report.app_id, quota)),
        None => lines.push(format!("Cloud Quota for AppID {}: unavailable", report.app_id)),
    }
    lines.push(format!("{} published file(s)", report.items.len()));
    lines.extend(report.items.iter().map(item_line));
    lines
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
