//! Execution engine - applies resources sequentially and flushes deferred
//! actions once per batch

use crate::context::{ApplyContext, DeferredRunner, ProgressCallback};
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};

/// Apply every resource in order, then flush deferred actions once
///
/// A failing resource is recorded and the batch continues. Deferred actions
/// queued by the resources that did succeed still run.
pub fn run_batch<R, P>(
    resources: &[Box<dyn Resource>],
    opts: &ExecuteOptions,
    runner: &mut R,
    progress: &mut P,
) -> ExecuteSummary
where
    R: DeferredRunner,
    P: ProgressCallback,
{
    let mut summary = ExecuteSummary::default();
    let mut ctx = ApplyContext::new(opts.dry_run, opts.verbose);

    progress.on_batch_start(resources.len());
    for resource in resources {
        progress.on_resource_start(&resource.id(), &resource.description());
        let result = apply_resource(resource.as_ref(), &mut ctx);
        progress.on_resource_complete(&resource.id(), &result);
        summary.add_result(&result);
    }
    progress.on_batch_complete();

    flush_deferred(&mut ctx, runner, progress, &mut summary);
    summary
}

/// Apply a single resource, converting errors into a failed result
pub fn apply_resource(resource: &dyn Resource, ctx: &mut ApplyContext) -> ApplyResult {
    match resource.apply(ctx) {
        Ok(result) => result,
        Err(e) => {
            log::error!("{} failed: {e:#}", resource.id());
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

/// Run every queued deferred action once, in queue order
pub fn flush_deferred<R, P>(
    ctx: &mut ApplyContext,
    runner: &mut R,
    progress: &mut P,
    summary: &mut ExecuteSummary,
) where
    R: DeferredRunner,
    P: ProgressCallback,
{
    let actions = ctx.take_deferred();
    if ctx.dry_run {
        return;
    }
    for action in actions {
        summary.deferred += 1;
        match runner.run(action) {
            Ok(()) => progress.on_deferred_complete(action, None),
            Err(e) => {
                log::error!("Deferred {action} failed: {e:#}");
                summary.deferred_failed += 1;
                progress.on_deferred_complete(action, Some(&format!("{e:#}")));
            }
        }
    }
}
