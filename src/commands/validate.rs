use anyhow::{Result, bail};

use super::load;
use crate::Context;
use crate::orchestrator;
use crate::ui;

/// Check every name and fail if any would be rewritten by Cobbler
pub fn run(ctx: &Context, names: &[String]) -> Result<()> {
    let loaded = load(ctx)?;

    let mut invalid = 0;
    for name in names {
        let validation = orchestrator::validate_name(&loaded.server, name);
        if validation.is_valid() {
            if !ctx.quiet {
                ui::success(&format!("{name}: valid"));
            }
            continue;
        }

        invalid += 1;
        let offenses: Vec<String> = validation
            .offenses()
            .iter()
            .map(|o| format!("'{o}'"))
            .collect();
        ui::error(&format!("{name}: contains {}", offenses.join(", ")));
    }

    if invalid > 0 {
        bail!(
            "{invalid} of {} names would be changed by Cobbler on import",
            names.len()
        );
    }
    Ok(())
}
