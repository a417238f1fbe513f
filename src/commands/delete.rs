use anyhow::{Result, bail};
use declarative::{ApplyContext, ApplyResult, ExecuteSummary, flush_deferred};

use super::load;
use crate::Context;
use crate::engine::executor::TerminalProgress;
use crate::orchestrator::{self, CobblerSync};
use crate::resource::{ImageSpec, ObjectSpec, ProfileSpec};
use crate::ui;

pub fn image(ctx: &Context, name: &str, arch: &str) -> Result<()> {
    run(ctx, |config| {
        let spec = config
            .images
            .iter()
            .find(|i| i.name == name && i.os_arch == arch)
            .cloned()
            .unwrap_or_else(|| ImageSpec::new(name, arch));
        ObjectSpec::Image(spec)
    })
}

pub fn profile(ctx: &Context, name: &str, distro: &str) -> Result<()> {
    run(ctx, |config| {
        // A declared profile knows its kickstart file name
        let spec = config
            .profiles
            .iter()
            .find(|p| p.name == name && p.distro == distro)
            .cloned()
            .unwrap_or_else(|| ProfileSpec::new(name, distro));
        ObjectSpec::Profile(spec)
    })
}

fn run<F>(ctx: &Context, spec: F) -> Result<()>
where
    F: FnOnce(&crate::config::Config) -> ObjectSpec,
{
    let loaded = load(ctx)?;
    let spec = spec(&loaded.config);
    let resource = orchestrator::resource(&loaded.server, spec.clone());
    let id = resource.id();

    let mut apply_ctx = ApplyContext::new(false, ctx.verbose > 0);
    let result = orchestrator::delete(&loaded.server, &spec, &mut apply_ctx)?;

    let mut summary = ExecuteSummary::default();
    summary.add_result(&result);
    flush_deferred(
        &mut apply_ctx,
        &mut CobblerSync::new(&loaded.server.client),
        &mut TerminalProgress {
            verbose: ctx.verbose > 0,
        },
        &mut summary,
    );

    match result {
        ApplyResult::Removed => ui::success(&format!("Removed {} {id}", resource.resource_type())),
        _ => ui::warn(&format!("{} {id} does not exist", resource.resource_type())),
    }

    if summary.deferred_failed > 0 {
        bail!("cobbler sync failed after removing {id}");
    }
    Ok(())
}
