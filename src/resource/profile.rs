//! Profile resource - distro plus kickstart and kernel options

use anyhow::{Context, Result};
use cobblerkit::artifact;
use cobblerkit::{Error as CobblerError, Expectation, OptionMap, ProfileAddArgs};
use declarative::{ApplyContext, ApplyResult, DeferredAction, Resource, ResourceState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::Ensure;
use crate::orchestrator::Server;

/// Declared profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    pub distro: String,
    /// File name inside the kickstart directory; derived from the breed when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickstart: Option<String>,
    /// Where to copy the kickstart from (local path or URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickstart_source: Option<String>,
    #[serde(default, skip_serializing_if = "OptionMap::is_empty")]
    pub kickstart_meta: OptionMap,
    #[serde(default = "default_kernel_options")]
    pub kernel_options: OptionMap,
    #[serde(default, skip_serializing_if = "OptionMap::is_empty")]
    pub kernel_options_postinstall: OptionMap,
    #[serde(default)]
    pub ensure: Ensure,
}

fn default_kernel_options() -> OptionMap {
    OptionMap::new().with("interface", "auto")
}

impl ProfileSpec {
    pub fn new(name: impl Into<String>, distro: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distro: distro.into(),
            kickstart: None,
            kickstart_source: None,
            kickstart_meta: OptionMap::new(),
            kernel_options: default_kernel_options(),
            kernel_options_postinstall: OptionMap::new(),
            ensure: Ensure::Present,
        }
    }
}

/// Profile resource bound to a Cobbler server
#[derive(Debug)]
pub struct Profile {
    spec: ProfileSpec,
    server: Arc<Server>,
}

impl Profile {
    pub fn new(spec: ProfileSpec, server: Arc<Server>) -> Self {
        Self { spec, server }
    }

    /// Kickstart file name, as declared or `<name>.<ext>` for the distro's breed
    pub fn kickstart_name(&self) -> Result<String> {
        if let Some(kickstart) = &self.spec.kickstart {
            return Ok(kickstart.clone());
        }
        let breed = self.server.client.distro_breed(&self.spec.distro)?;
        let extension = breed
            .kickstart_extension()
            .ok_or_else(|| CobblerError::UnsupportedBreed(breed.to_string()))?;
        Ok(format!("{}.{extension}", self.spec.name))
    }

    /// Absolute path of the installed kickstart
    pub fn kickstart_path(&self) -> Result<PathBuf> {
        Ok(self.server.paths.kickstart_dir.join(self.kickstart_name()?))
    }

    fn exists(&self) -> Result<bool> {
        Ok(self
            .server
            .client
            .profile_exists(&self.spec.name, &self.spec.distro)?)
    }

    fn ensure_present(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let client = &self.server.client;
        if self.exists()? {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }

        let kickstart = self.kickstart_path()?;
        if let Some(source) = &self.spec.kickstart_source {
            artifact::fetch(source, &kickstart, None)
                .with_context(|| format!("Failed to install kickstart for {}", self.spec.name))?;
        }

        let path = kickstart.to_string_lossy();
        client.add_profile(&ProfileAddArgs {
            name: &self.spec.name,
            distro: &self.spec.distro,
            kickstart: &path,
            kernel_options: &self.spec.kernel_options,
            kernel_options_post: &self.spec.kernel_options_postinstall,
            kickstart_meta: &self.spec.kickstart_meta,
        })?;
        ctx.defer(DeferredAction::Sync);
        client.verify_profile(&self.spec.name, &self.spec.distro, Expectation::Present)?;
        Ok(ApplyResult::Created)
    }

    fn ensure_absent(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let client = &self.server.client;
        if !self.exists()? {
            // A kickstart can outlive its profile; it is not part of the state
            if !ctx.dry_run {
                self.remove_kickstart(log::Level::Debug)?;
            }
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }

        client.remove_profile(&self.spec.name)?;
        ctx.defer(DeferredAction::Sync);
        self.remove_kickstart(log::Level::Warn)?;

        client.verify_profile(&self.spec.name, &self.spec.distro, Expectation::Absent)?;
        Ok(ApplyResult::Removed)
    }

    /// Delete the kickstart file if it exists
    ///
    /// A path that cannot be derived is logged at `level` and skipped.
    fn remove_kickstart(&self, level: log::Level) -> Result<()> {
        match self.kickstart_path() {
            Ok(path) if path.is_file() => {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                log::info!("Removed {}", path.display());
            }
            Ok(_) => {}
            Err(e) => log::log!(
                level,
                "Leaving kickstart of {} in place: {e:#}",
                self.spec.name
            ),
        }
        Ok(())
    }
}

impl Resource for Profile {
    fn id(&self) -> String {
        self.spec.name.clone()
    }

    fn description(&self) -> String {
        match self.spec.ensure {
            Ensure::Present => format!("Profile {} on {}", self.spec.name, self.spec.distro),
            Ensure::Absent => format!("Remove profile {}", self.spec.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        "profile"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.exists()? {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        match self.spec.ensure {
            Ensure::Present => ResourceState::Present { details: None },
            Ensure::Absent => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        match self.spec.ensure {
            Ensure::Present => self.ensure_present(ctx),
            Ensure::Absent => self.ensure_absent(ctx),
        }
    }
}
