//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging systems to match the desired state.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (images, profiles)
//! - **ResourceState**: The current or desired state of a resource
//! - **ExecutionPlan**: An ordered batch of resources
//! - **DeferredActions**: Deduplicated follow-up work queued during a batch
//! - **Executor**: Applies resources one at a time, then flushes deferred actions once
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     ApplyContext, ApplyResult, DeferredAction, DeferredRunner, ExecuteOptions,
//!     ExecutionPlan, NoProgress, Resource, ResourceState, run_batch,
//! };
//!
//! #[derive(Debug)]
//! struct Profile { name: String }
//!
//! impl Resource for Profile {
//!     fn id(&self) -> String { self.name.clone() }
//!     fn description(&self) -> String { format!("Profile {}", self.name) }
//!     fn resource_type(&self) -> &'static str { "profile" }
//!
//!     fn current_state(&self) -> anyhow::Result<ResourceState> {
//!         Ok(ResourceState::Absent)
//!     }
//!
//!     fn desired_state(&self) -> ResourceState {
//!         ResourceState::Present { details: None }
//!     }
//!
//!     fn apply(&self, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
//!         // ... add the profile ...
//!         ctx.defer(DeferredAction::Sync);
//!         Ok(ApplyResult::Created)
//!     }
//! }
//!
//! struct Sync;
//!
//! impl DeferredRunner for Sync {
//!     fn run(&mut self, _action: DeferredAction) -> anyhow::Result<()> {
//!         // ... publish state ...
//!         Ok(())
//!     }
//! }
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(Profile { name: "web".into() }));
//!
//! let summary = run_batch(
//!     &plan.resources,
//!     &ExecuteOptions::default(),
//!     &mut Sync,
//!     &mut NoProgress,
//! );
//! assert_eq!(summary.deferred, 1);
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`DeferredRunner`]: Performs deferred actions after a batch
//! - [`ProgressCallback`]: Receives progress updates
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or provisioning backends.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, DeferredAction, DeferredActions, DeferredRunner, NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_type};
pub use executor::{apply_resource, flush_deferred, run_batch};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
