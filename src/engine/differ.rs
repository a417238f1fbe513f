//! Diff display - cobblerd terminal UI

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};

/// Heading for a resource type
fn type_name(resource_type: &str) -> &str {
    match resource_type {
        "image" => "Images (distros)",
        "profile" => "Profiles",
        other => other,
    }
}

/// One-character marker for a diff
fn diff_symbol(diff: &ResourceDiff) -> colored::ColoredString {
    if diff.is_unknown() {
        "?".red()
    } else if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else {
        "~".yellow()
    }
}

/// Short description of the transition
pub fn state_desc(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Unknown, _) => diff
            .error
            .clone()
            .unwrap_or_else(|| "(state unknown)".to_string()),
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(not present){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
        (ResourceState::Present { .. }, ResourceState::Absent) => "(will remove)".to_string(),
        _ => String::new(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Cobbler Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        println!("│ {}", type_name(resource_type).bold());

        for diff in type_diffs {
            let desc = state_desc(diff);
            let desc = if diff.is_unknown() {
                desc.red().to_string()
            } else {
                desc.dimmed().to_string()
            };
            println!("│   {} {:<30} {}", diff_symbol(diff), diff.resource_id, desc);
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to modify, {} to remove, {} unknown)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red(),
        summary.unknown.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
