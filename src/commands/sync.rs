use anyhow::Result;

use super::load;
use crate::Context;
use crate::ui;

/// Run `cobbler sync` on demand
pub fn run(ctx: &Context) -> Result<()> {
    let loaded = load(ctx)?;
    loaded.server.client.sync()?;
    if !ctx.quiet {
        ui::success("cobbler sync complete");
    }
    Ok(())
}
