//! Formatted output helpers for CLI commands.
//!
//! Everything human-facing goes to stderr; stdout is reserved for
//! machine-readable output (`mounts --json`, `pass-files`).

use sqdeploy_common::types::Warning;
use sqdeploy_compose::planner::MountChange;
use sqdeploy_compose::writer::CommitOutcome;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";
pub const YELLOW: &str = "\x1b[33m";
pub const RESET: &str = "\x1b[0m";

/// Prints the tool banner.
pub fn print_header() {
    eprintln!();
    eprintln!("  {BOLD}sqdeploy{RESET} {DIM}v{}{RESET}", env!("CARGO_PKG_VERSION"));
    eprintln!();
}

/// Prints every warning, one per line.
pub fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("  {YELLOW}warning:{RESET} {warning}");
    }
}

/// One-line description of a planned mount change.
#[must_use]
pub fn describe_change(change: &MountChange) -> String {
    match change {
        MountChange::Added(b) => format!("+ {} <- {}", b.container_path, b.host_path),
        MountChange::Unchanged(b) => format!("= {} (already mounted)", b.container_path),
        MountChange::Skipped { requested, existing } => format!(
            "! {} keeps {} (skipped {})",
            existing.container_path, existing.host_path, requested.host_path
        ),
        MountChange::Replaced { previous, current } => format!(
            "~ {} <- {} (was {})",
            current.container_path, current.host_path, previous.host_path
        ),
    }
}

/// One-line description of what happened to the override file.
#[must_use]
pub fn describe_commit(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Saved { location, bindings } => {
            format!("wrote {bindings} mount(s) to {location}")
        }
        CommitOutcome::Removed {
            location,
            existed: true,
        } => format!("removed {location}"),
        CommitOutcome::Removed {
            location,
            existed: false,
        } => format!("{location} was already absent"),
    }
}
