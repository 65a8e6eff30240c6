//! Console output for the dirmirror CLI

use console::style;
use dirmirror_sync::{ChangeSet, SyncReport};
use dirmirror_types::{PhaseStats, SyncPhase};
use std::path::Path;
use std::time::Duration;

/// Print the final run summary
pub fn print_sync_report(report: &SyncReport, log_path: Option<&Path>) {
    println!();
    if report.already_in_sync() {
        display_success("Target is already in sync with the reference, nothing to do");
    } else {
        println!("{}", style("Sync Summary:").bold().underlined());
        println!(
            "  Copied/overwritten into target: {}",
            style(report.copied_into_target()).green()
        );
        println!(
            "  Removed from target: {}",
            style(report.removed_from_target()).green()
        );

        for phase in SyncPhase::ORDER {
            let stats = report.phase(phase);
            if stats.planned > 0 {
                print_phase(phase, stats);
            }
        }

        println!(
            "  Bytes copied: {}",
            style(format_bytes(report.totals().bytes_copied)).green()
        );
        let failures = report.failures();
        println!(
            "  Failures: {}",
            if failures > 0 {
                style(failures).red()
            } else {
                style(failures).green()
            }
        );
    }

    println!(
        "  Duration: {}",
        style(format_duration(report.duration)).blue()
    );
    println!("  Run id: {}", style(report.run_id).dim());

    if report.dry_run {
        display_info("Dry run - no changes were made");
    }
    if report.interrupted {
        display_warning("Run interrupted - re-run to converge");
    } else if report.failures() > 0 {
        display_warning("Some items failed - see the log for details");
    }
    if let Some(path) = log_path {
        display_info(&format!("Log file: {}", path.display()));
    }
}

fn print_phase(phase: SyncPhase, stats: &PhaseStats) {
    println!(
        "  {}: {} planned, {} applied, {} mirrored, {} local failures, {} remote failures",
        style(phase).cyan(),
        stats.planned,
        stats.applied,
        stats.mirrored,
        stats.local_failures,
        stats.remote_failures
    );
}

/// Print a change set in human-readable form
pub fn print_change_set(changes: &ChangeSet) {
    if changes.is_empty() {
        display_success("No differences found");
        return;
    }

    println!("{}", style("Differences:").bold().underlined());
    for path in &changes.deleted {
        println!("  {} {}", style("+").green().bold(), path);
    }
    for entry in &changes.modified {
        println!(
            "  {} {} {}",
            style("~").yellow().bold(),
            entry.path,
            style(entry.details()).dim()
        );
    }
    for path in changes.purge_order() {
        println!("  {} {}", style("-").red().bold(), path);
    }

    println!();
    println!(
        "  {} to copy, {} to update, {} to remove",
        style(changes.deleted.len()).green(),
        style(changes.modified.len()).yellow(),
        style(changes.added.len()).red()
    );
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display a warning message with proper formatting
pub fn display_warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

/// Display an info message with proper formatting
pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}
