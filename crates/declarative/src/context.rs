//! Apply context, deferred actions, and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific deferred action runner or progress display.

use crate::types::ApplyResult;
use anyhow::Result;
use std::fmt;

/// Work a resource requests to run once after the whole batch.
///
/// Queued through [`ApplyContext::defer`]; however many resources queue the
/// same action, it runs once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredAction {
    /// Publish the provisioning server's state to its served artifacts
    Sync,
}

impl fmt::Display for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// Ordered set of deferred actions, in first-queued order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredActions {
    queue: Vec<DeferredAction>,
}

impl DeferredActions {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action unless it is already queued.
    ///
    /// Returns `true` when the action was newly queued.
    pub fn push(&mut self, action: DeferredAction) -> bool {
        if self.queue.contains(&action) {
            return false;
        }
        self.queue.push(action);
        true
    }

    /// Whether the action is queued
    pub fn contains(&self, action: DeferredAction) -> bool {
        self.queue.contains(&action)
    }

    /// Queued actions in order
    pub fn iter(&self) -> impl Iterator<Item = &DeferredAction> {
        self.queue.iter()
    }

    /// Number of queued actions
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remove and return every queued action, leaving the queue empty
    pub fn take(&mut self) -> Vec<DeferredAction> {
        std::mem::take(&mut self.queue)
    }
}

/// Runner for deferred actions
///
/// Implement this trait to perform the work behind each [`DeferredAction`].
pub trait DeferredRunner {
    /// Run one deferred action
    fn run(&mut self, action: DeferredAction) -> Result<()>;
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called when starting to apply a batch of resources
    fn on_batch_start(&mut self, count: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);

    /// Called after a deferred action ran; `error` is set when it failed
    fn on_deferred_complete(&mut self, _action: DeferredAction, _error: Option<&str>) {}
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Context passed to resource apply operations
///
/// One context is shared by every resource of a batch, so deferred actions
/// queued by any of them are collected in one place.
#[derive(Debug, Default)]
pub struct ApplyContext {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
    deferred: DeferredActions,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self {
            dry_run,
            verbose,
            deferred: DeferredActions::new(),
        }
    }

    /// Queue an action to run once after the batch
    pub fn defer(&mut self, action: DeferredAction) {
        if self.deferred.push(action) {
            log::debug!("Deferred {action} until the end of the batch");
        }
    }

    /// Actions queued so far
    pub fn deferred(&self) -> &DeferredActions {
        &self.deferred
    }

    /// Drain the queued actions
    pub fn take_deferred(&mut self) -> Vec<DeferredAction> {
        self.deferred.take()
    }
}
