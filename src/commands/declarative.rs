//! Declarative commands
//!
//! - `status` - Show current state vs desired state
//! - `diff` - Preview what apply would change
//! - `apply` - Make Cobbler match the declared objects

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{ExecutionPlan, Resource, compute_diffs};

use super::{Loaded, load};
use crate::Context;
use crate::engine::{self, ApplyOptions, differ};
use crate::orchestrator;
use crate::ui;

/// Declared objects, narrowed to `target`
fn plan(loaded: &Loaded, target: Option<&str>) -> ExecutionPlan {
    orchestrator::build_plan(&loaded.server, &loaded.config).filter_by_target(target)
}

fn print_empty(target: Option<&str>) {
    match target {
        Some(t) => ui::info(&format!("No declared objects match '{t}'")),
        None => ui::info("No objects declared"),
    }
}

pub fn status(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = load(ctx)?;
    let plan = plan(&loaded, target);

    ui::header("Cobbler Status");
    ui::kv("Config", &loaded.path.display().to_string());

    if plan.is_empty() {
        println!();
        print_empty(target);
        return Ok(());
    }

    let mut current_type = "";
    let mut unknown = 0;
    for resource in &plan.resources {
        if resource.resource_type() != current_type {
            current_type = resource.resource_type();
            ui::section(&format!("{current_type}s"));
        }
        if !status_line(resource.as_ref(), ctx.verbose > 0) {
            unknown += 1;
        }
    }

    if unknown > 0 {
        println!();
        bail!("Could not determine the state of {unknown} objects");
    }
    Ok(())
}

/// Print one object's state; false when it could not be queried
fn status_line(resource: &dyn Resource, verbose: bool) -> bool {
    let desired = resource.desired_state();
    match resource.current_state() {
        Ok(current) if current == desired => {
            println!("  {} {:<30} {}", "✓".green(), resource.id(), current);
        }
        Ok(current) => {
            println!(
                "  {} {:<30} {} {}",
                "✗".yellow(),
                resource.id(),
                current,
                format!("(want {desired})").dimmed()
            );
        }
        Err(e) => {
            println!(
                "  {} {:<30} {}",
                "?".red(),
                resource.id(),
                format!("{e:#}").red()
            );
            return false;
        }
    }
    if verbose {
        ui::dim(&ui::truncate_end(&resource.description(), 72));
    }
    true
}

pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = load(ctx)?;
    let plan = plan(&loaded, target);
    if plan.is_empty() {
        print_empty(target);
        return Ok(());
    }

    differ::display_diff(&compute_diffs(&plan.resources));
    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let loaded = load(ctx)?;
    let plan = plan(&loaded, target);
    if plan.is_empty() {
        print_empty(target);
        return Ok(());
    }

    let opts = ApplyOptions {
        dry_run,
        yes,
        verbose: ctx.verbose > 0,
    };
    let summary = engine::execute(&loaded.server, plan, &opts)?;

    if !summary.is_success() {
        bail!(
            "{} objects failed, {} syncs failed",
            summary.failed,
            summary.deferred_failed
        );
    }
    Ok(())
}
