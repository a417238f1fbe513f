//! Diff computation for resources

use crate::resource::Resource;
use crate::types::ResourceState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
    /// Why the current state could not be determined
    pub error: Option<String>,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let current = resource.current_state()?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self::new(resource, current, desired)))
    }

    /// Create a diff for a resource whose state query failed
    pub fn unknown(resource: &dyn Resource, error: &anyhow::Error) -> Self {
        let mut diff = Self::new(resource, ResourceState::Unknown, resource.desired_state());
        diff.error = Some(format!("{error:#}"));
        diff
    }

    fn new(resource: &dyn Resource, current: ResourceState, desired: ResourceState) -> Self {
        Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired,
            error: None,
        }
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. } | ResourceState::Modified { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Modified { .. }, ResourceState::Present { .. })
        ) || matches!(
            (&self.current, &self.desired),
            (
                ResourceState::Present { details: Some(_) },
                ResourceState::Present { details: Some(_) }
            )
        )
    }

    /// Check if the current state could not be determined
    pub fn is_unknown(&self) -> bool {
        matches!(self.current, ResourceState::Unknown)
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between current and desired
/// state. A resource whose state query fails is reported with an unknown
/// current state instead of being dropped.
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> Vec<ResourceDiff> {
    resources
        .iter()
        .filter_map(|r| match ResourceDiff::from_resource(r.as_ref()) {
            Ok(diff) => diff,
            Err(e) => {
                log::warn!("Could not determine state of {}: {e:#}", r.id());
                Some(ResourceDiff::unknown(r.as_ref(), &e))
            }
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of resources whose state is unknown
    pub unknown: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_unknown() {
                summary.unknown += 1;
            } else if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.unknown
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type, in type name order
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<&str, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.as_str())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::ApplyResult;

    #[derive(Debug)]
    struct Fixed {
        id: &'static str,
        current: Option<ResourceState>,
        desired: ResourceState,
    }

    impl Resource for Fixed {
        fn id(&self) -> String {
            self.id.to_string()
        }

        fn description(&self) -> String {
            format!("Fixed {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "image"
        }

        fn current_state(&self) -> Result<ResourceState> {
            self.current
                .clone()
                .ok_or_else(|| anyhow::anyhow!("query failed"))
        }

        fn desired_state(&self) -> ResourceState {
            self.desired.clone()
        }

        fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
    }

    fn present() -> ResourceState {
        ResourceState::Present { details: None }
    }

    #[test]
    fn test_converged_resources_have_no_diff() {
        let resources: Vec<Box<dyn Resource>> = vec![Box::new(Fixed {
            id: "a",
            current: Some(present()),
            desired: present(),
        })];
        assert!(compute_diffs(&resources).is_empty());
    }

    #[test]
    fn test_failed_query_is_kept_as_unknown() {
        let resources: Vec<Box<dyn Resource>> = vec![
            Box::new(Fixed {
                id: "a",
                current: None,
                desired: present(),
            }),
            Box::new(Fixed {
                id: "b",
                current: Some(ResourceState::Absent),
                desired: present(),
            }),
        ];
        let diffs = compute_diffs(&resources);
        assert_eq!(diffs.len(), 2);
        assert!(diffs[0].is_unknown());
        assert_eq!(diffs[0].error.as_deref(), Some("query failed"));
        assert!(diffs[1].is_addition());

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.additions, 1);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_removal() {
        let resources: Vec<Box<dyn Resource>> = vec![Box::new(Fixed {
            id: "a",
            current: Some(present()),
            desired: ResourceState::Absent,
        })];
        let diffs = compute_diffs(&resources);
        assert!(diffs[0].is_removal());
        assert_eq!(group_by_type(&diffs)["image"].len(), 1);
    }
}
