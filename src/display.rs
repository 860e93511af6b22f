//! Colored CLI display utilities for resource groups and action results.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::clearcase::ViewType;
use crate::scm::{ActionOutcome, GroupKind, GroupSnapshot, GroupState, TrackedResource};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Path relative to `root` when it lies inside it, otherwise unchanged.
#[must_use]
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// One resource line: relative path plus its version, if known.
#[must_use]
pub fn format_resource(root: &Path, resource: &TrackedResource) -> String {
    let path = relative_display(root, resource.path());
    match resource.version() {
        Some(version) => format!("{path}@@{version}"),
        None => path,
    }
}

fn group_tag(kind: GroupKind) -> String {
    match kind {
        GroupKind::CheckedOut => "[CHECKEDOUT]".yellow().bold().to_string(),
        GroupKind::Elements => "[ELEMENT]".blue().bold().to_string(),
        GroupKind::ViewPrivate => "[PRIVATE]".magenta().bold().to_string(),
    }
}

fn state_label(state: GroupState) -> String {
    match state {
        GroupState::Fresh => "fresh".green().to_string(),
        GroupState::Refreshing => "refreshing".cyan().to_string(),
        GroupState::Stale => "stale".red().to_string(),
    }
}

/// Print a group header and its resources.
///
/// Empty groups that hide when empty print nothing.
pub fn print_group(
    root: &Path,
    kind: GroupKind,
    snapshot: &GroupSnapshot,
    hide_when_empty: bool,
) {
    if hide_when_empty && snapshot.resources.is_empty() {
        return;
    }
    println!(
        "{} {} ({}, {})",
        timestamp().dimmed(),
        kind.label().bold(),
        snapshot.resources.len(),
        state_label(snapshot.state)
    );
    for resource in &snapshot.resources {
        println!("  {} {}", group_tag(kind), format_resource(root, resource));
    }
    let _ = io::stdout().flush();
}

/// Print the badge count.
pub fn print_badge(count: usize) {
    println!(
        "{} {} {} checked out",
        timestamp().dimmed(),
        "[BADGE]".cyan().bold(),
        count
    );
    let _ = io::stdout().flush();
}

/// Print the detected view type.
pub fn print_view_type(view_type: ViewType) {
    let label = match view_type {
        ViewType::Dynamic => "dynamic".green().to_string(),
        ViewType::Snapshot => "snapshot".green().to_string(),
        ViewType::Unknown => "unknown".red().to_string(),
    };
    println!("{} {}", "[VIEW]".blue().bold(), label);
    let _ = io::stdout().flush();
}

/// Print the result of a dispatched action.
pub fn print_outcome(command: &str, outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::Completed => {
            println!("{} {}", "[DONE]".green().bold(), command);
        }
        ActionOutcome::Skipped => {
            println!(
                "{} {} - {}",
                "[SKIP]".yellow().bold(),
                command,
                "no file selected".dimmed()
            );
        }
        ActionOutcome::Failed(message) => {
            println!("{} {} - {}", "[FAIL]".red().bold(), command, message);
        }
    }
    let _ = io::stdout().flush();
}

/// Print whether a single file is checked out.
pub fn print_checked_out(path: &Path, checked_out: bool) {
    let state = if checked_out {
        "checked out".yellow().to_string()
    } else {
        "not checked out".dimmed().to_string()
    };
    println!("{} {}", path.display(), state);
    let _ = io::stdout().flush();
}

/// Print the diagnostic output channel.
pub fn print_output_channel(lines: &[String]) {
    for line in lines {
        println!("{} {}", "[OUTPUT]".dimmed(), line);
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stderr().flush();
}
