//! Execution engine - cobblerd executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, DeferredAction, ExecuteOptions, ExecuteSummary, ExecutionPlan, ProgressCallback,
    compute_diffs,
};

use super::differ::display_diff;
use crate::orchestrator::{self, Server};

/// Options for `apply` (adds `yes` to skip the confirmation prompt)
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Execute the plan with terminal output
pub fn execute(
    server: &Server,
    plan: ExecutionPlan,
    opts: &ApplyOptions,
) -> Result<ExecuteSummary> {
    // 1. Compute diffs for all resources
    let diffs = compute_diffs(&plan.resources);

    // 2. Display what will change
    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary {
            no_change: plan.total_resources(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    // 3. Confirm (unless --yes)
    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    // 4. Apply sequentially, then sync once
    let exec_opts = ExecuteOptions {
        dry_run: false,
        verbose: opts.verbose,
    };
    let mut progress = TerminalProgress {
        verbose: opts.verbose,
    };
    let summary = orchestrator::apply(server, &plan.resources, &exec_opts, &mut progress);

    // 5. Summary
    print_summary(&summary);

    Ok(summary)
}

/// Prints one line per applied resource
pub struct TerminalProgress {
    pub verbose: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_batch_start(&mut self, count: usize) {
        println!();
        println!("  {} Applying {} resources...", "→".cyan(), count);
    }

    fn on_resource_start(&mut self, id: &str, description: &str) {
        if self.verbose {
            println!("    {} {} {}", "·".dimmed(), id, description.dimmed());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let symbol = result_symbol(result);
        match result {
            ApplyResult::Failed { error } => {
                println!("    {} {} {}", symbol, id, error.red());
            }
            ApplyResult::Skipped { reason } => {
                println!("    {} {} {}", symbol, id, reason.dimmed());
            }
            ApplyResult::NoChange if !self.verbose => {}
            _ => println!("    {} {}", symbol, id),
        }
    }

    fn on_batch_complete(&mut self) {}

    fn on_deferred_complete(&mut self, action: DeferredAction, error: Option<&str>) {
        match error {
            None => println!("  {} cobbler {}", "✓".green(), action),
            Some(e) => println!("  {} cobbler {} {}", "✗".red(), action, e.red()),
        }
    }
}

/// Status symbol for a result
pub fn result_symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
        ApplyResult::Failed { .. } => "✗".red(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} objects created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} objects modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} objects removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} objects skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "objects".red());
    }
    if summary.deferred_failed > 0 {
        println!("    • {} {}", summary.deferred_failed, "sync failed".red());
    }
}
