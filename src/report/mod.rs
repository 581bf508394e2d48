use colored::Colorize;
use thiserror::Error;

use crate::integrate::{ApplyOutcome, FetchOutcome, GeneratePlan};
use crate::webrev::{WebrevMetadata, WebrevStats};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Metadata as pretty-printed JSON.
pub fn metadata_json(metadata: &WebrevMetadata) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(metadata)?)
}

/// Human-readable summary of a webrev header.
///
/// Absent fields are left out rather than printed empty.
pub fn format_metadata(metadata: &WebrevMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n",
        "Webrev:".bold(),
        metadata.source_uri
    ));

    let mut field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            out.push_str(&format!("  {:<26}{}\n", format!("{}:", label).cyan(), value));
        }
    };

    field("Prepared by", metadata.author.clone());
    field("Branch", metadata.branch.clone());
    field("Workspace", metadata.workspace.clone());
    field(
        "Repository",
        metadata.repository_uri.as_ref().map(|u| u.to_string()),
    );
    field("Compare against", metadata.compare_against.clone());
    field(
        "Compare against version",
        metadata.compare_against_version.clone(),
    );
    field(
        "Compare against revision",
        metadata.compare_against_revision.clone(),
    );
    field("Summary", metadata.summary.as_ref().map(format_stats));
    field("Patch", metadata.patch_uri.as_ref().map(|u| u.to_string()));
    field(
        "Changeset",
        metadata.changeset_uri.as_ref().map(|u| u.to_string()),
    );
    out
}

fn format_stats(stats: &WebrevStats) -> String {
    format!(
        "{} lines changed ({}, {}, {})",
        stats.lines_changed,
        format!("+{}", stats.insertions).green(),
        format!("-{}", stats.deletions).red(),
        format!("~{}", stats.modifications).yellow(),
    )
}

pub fn print_metadata(metadata: &WebrevMetadata) {
    print!("{}", format_metadata(metadata));
}

pub fn print_apply(outcome: &ApplyOutcome) {
    println!(
        "{} {} to the working copy",
        "Applied".green().bold(),
        outcome.patch_uri
    );
    if let Some(stats) = &outcome.metadata.summary {
        println!("  {}", format_stats(stats));
    }
}

pub fn print_fetch(outcome: &FetchOutcome) {
    println!(
        "{} branch {} at {} (from {})",
        "Created".green().bold(),
        outcome.branch.name().bold(),
        outcome.target.commit,
        outcome.target.origin,
    );
    println!("  commit {}", outcome.commit);
    if let Some(author) = &outcome.metadata.author {
        println!("  author {}", author);
    }
    if let Some(stats) = &outcome.metadata.summary {
        println!("  {}", format_stats(stats));
    }
}

pub fn print_generate(plan: &GeneratePlan) {
    println!(
        "{} webrev \"{}\" in {}",
        "Generated".green().bold(),
        plan.title,
        plan.output.display()
    );
    println!("  compared against {}", plan.base);
}
