//! Image resource - installation ISO imported as a Cobbler distro
//!
//! Importing creates a distro named `<name>-<arch>`. Kernel and initrd can be
//! overridden afterwards with managed copies under the TFTP images directory;
//! those are replaced whenever their checksum no longer matches.

use anyhow::{Context, Result};
use cobblerkit::artifact::{self, UpdateReason};
use cobblerkit::naming;
use cobblerkit::{Artifact, Breed, DistroEditArgs, Expectation, ImportArgs, Report};
use declarative::{ApplyContext, ApplyResult, DeferredAction, Resource, ResourceState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Ensure;
use crate::orchestrator::Server;

/// Declared image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    /// ISO location: local path, `file://` or `http(s)://` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Where the ISO is stored before import; defaults to the file cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    /// SHA-256 of the ISO
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default = "default_arch")]
    pub os_arch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_breed: Option<Breed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initrd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initrd_checksum: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

fn default_arch() -> String {
    "x86_64".to_string()
}

impl ImageSpec {
    /// Declaration identifying an image only by name and architecture
    pub fn new(name: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            target: None,
            checksum: None,
            os_version: None,
            os_arch: arch.into(),
            os_breed: None,
            kernel: None,
            kernel_checksum: None,
            initrd: None,
            initrd_checksum: None,
            ensure: Ensure::Present,
        }
    }

    /// Name of the distro Cobbler creates on import
    pub fn distro(&self) -> String {
        format!("{}-{}", self.name, self.os_arch)
    }

    /// Configured boot artifacts, kernel first
    fn artifacts(&self) -> impl Iterator<Item = (Artifact, &str, Option<&str>)> {
        [
            (Artifact::Kernel, &self.kernel, &self.kernel_checksum),
            (Artifact::Initrd, &self.initrd, &self.initrd_checksum),
        ]
        .into_iter()
        .filter_map(|(artifact, source, checksum)| {
            source
                .as_deref()
                .map(|s| (artifact, s, checksum.as_deref()))
        })
    }
}

/// A boot artifact that has to be installed
#[derive(Debug)]
struct PendingArtifact<'a> {
    artifact: Artifact,
    source: &'a str,
    checksum: Option<&'a str>,
    reason: UpdateReason,
}

/// Image resource bound to a Cobbler server
#[derive(Debug)]
pub struct Image {
    spec: ImageSpec,
    server: Arc<Server>,
}

impl Image {
    pub fn new(spec: ImageSpec, server: Arc<Server>) -> Self {
        Self { spec, server }
    }

    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    fn validate(&self) -> Result<()> {
        naming::validate(&self.spec.name, &self.server.reserved_words)
            .into_result(&self.spec.name)?;
        Ok(())
    }

    fn source(&self) -> Result<&str> {
        self.spec
            .source
            .as_deref()
            .with_context(|| format!("image {} has no source", self.spec.name))
    }

    fn breed(&self) -> Result<&Breed> {
        self.spec
            .os_breed
            .as_ref()
            .with_context(|| format!("image {} has no os_breed", self.spec.name))
    }

    /// Where the ISO is stored before import
    pub fn target(&self) -> Result<PathBuf> {
        if let Some(target) = &self.spec.target {
            return Ok(target.clone());
        }
        let source = self.source()?;
        let extension = artifact::basename(source)
            .and_then(|b| Path::new(b).extension())
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Ok(self
            .server
            .paths
            .file_cache
            .join(format!("{}{extension}", self.spec.name)))
    }

    /// Managed location of a kernel or initrd fetched from `source`
    pub fn installed_path(&self, source: &str) -> Result<PathBuf> {
        let file = artifact::basename(source)
            .with_context(|| format!("Cannot derive a file name from {source}"))?;
        Ok(self
            .server
            .paths
            .tftp_images_dir
            .join(self.spec.distro())
            .join(file))
    }

    /// Artifacts whose installed copy must be replaced
    ///
    /// `report` is the distro as Cobbler knows it; `force` is set right after
    /// an import, when the distro still points at the ISO's own kernel.
    fn pending_artifacts(
        &self,
        report: Option<&Report>,
        force: bool,
    ) -> Result<Vec<PendingArtifact<'_>>> {
        let distro = self.spec.distro();
        let mut pending = Vec::new();
        for (artifact, source, checksum) in self.spec.artifacts() {
            let installed = match (force, report) {
                (false, Some(report)) => Some(report.field(&distro, artifact.report_label())?),
                _ => None,
            };
            let decision = artifact::needs_update(installed.map(Path::new), checksum, force)?;
            if let Some(reason) = decision {
                log::debug!("{distro}: {artifact} needs update ({reason})");
                pending.push(PendingArtifact {
                    artifact,
                    source,
                    checksum,
                    reason,
                });
            }
        }
        Ok(pending)
    }

    fn import(&self, ctx: &mut ApplyContext) -> Result<()> {
        let client = &self.server.client;
        let source = self.source()?;
        let breed = self.breed()?;
        let target = self.target()?;
        let checksum = self.spec.checksum.as_deref();

        match artifact::needs_update(Some(&target), checksum, false)? {
            None | Some(UpdateReason::NoChecksum) => {
                log::info!("Reusing {}", target.display());
            }
            Some(_) => artifact::fetch(source, &target, checksum)?,
        }

        let mount_point = self.server.paths.file_cache.join("mnt");
        fs::create_dir_all(&mount_point)
            .with_context(|| format!("Failed to create {}", mount_point.display()))?;
        client.mount_iso(&target, &mount_point)?;

        let path = mount_point.to_string_lossy();
        let imported = client.import(&ImportArgs {
            name: &self.spec.name,
            path: &path,
            breed,
            arch: &self.spec.os_arch,
            os_version: self.spec.os_version.as_deref(),
        });
        let unmounted = client.unmount(&mount_point);
        imported?;
        // The distro exists from here on, whatever happens to the cleanup
        ctx.defer(DeferredAction::Sync);
        unmounted?;

        if let Err(e) = fs::remove_dir(&mount_point) {
            log::warn!("Could not remove {}: {e}", mount_point.display());
        }
        fs::remove_file(&target)
            .with_context(|| format!("Failed to remove {}", target.display()))?;
        Ok(())
    }

    fn install_artifact(
        &self,
        pending: &PendingArtifact<'_>,
        ctx: &mut ApplyContext,
    ) -> Result<()> {
        let client = &self.server.client;
        let distro = self.spec.distro();
        let dest = self.installed_path(pending.source)?;
        log::info!("Updating {} of {distro}: {}", pending.artifact, pending.reason);

        artifact::fetch(pending.source, &dest, pending.checksum)?;

        let path = dest.to_string_lossy();
        client.edit_distro_artifact(&DistroEditArgs {
            distro: &distro,
            artifact: pending.artifact,
            path: &path,
            breed: self.breed()?,
            arch: &self.spec.os_arch,
            os_version: self.spec.os_version.as_deref(),
        })?;
        ctx.defer(DeferredAction::Sync);
        client.verify_distro(&distro, Expectation::Present)?;
        Ok(())
    }

    fn ensure_present(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let client = &self.server.client;
        let distro = self.spec.distro();
        let state = client.distro_state(&distro)?;
        let new_distro = state.is_absent();

        if ctx.dry_run {
            let pending =
                !new_distro && !self.pending_artifacts(state.report(), false)?.is_empty();
            if new_distro || pending {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            return Ok(ApplyResult::NoChange);
        }

        if new_distro {
            self.import(ctx)?;
        }
        client.verify_distro(&distro, Expectation::Present)?;

        let pending = self.pending_artifacts(state.report(), new_distro)?;
        for artifact in &pending {
            self.install_artifact(artifact, ctx)?;
        }

        Ok(if new_distro {
            ApplyResult::Created
        } else if pending.is_empty() {
            ApplyResult::NoChange
        } else {
            ApplyResult::Modified
        })
    }

    fn ensure_absent(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let client = &self.server.client;
        let distro = self.spec.distro();
        if client.distro_state(&distro)?.is_absent() {
            return Ok(ApplyResult::NoChange);
        }
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }

        client.remove_distro(&distro)?;
        ctx.defer(DeferredAction::Sync);
        client.verify_distro(&distro, Expectation::Absent)?;
        Ok(ApplyResult::Removed)
    }
}

impl Resource for Image {
    fn id(&self) -> String {
        self.spec.distro()
    }

    fn description(&self) -> String {
        match self.spec.ensure {
            Ensure::Present => match &self.spec.source {
                Some(source) => format!("Import {} from {source}", self.spec.distro()),
                None => format!("Import {}", self.spec.distro()),
            },
            Ensure::Absent => format!("Remove distro {}", self.spec.distro()),
        }
    }

    fn resource_type(&self) -> &'static str {
        "image"
    }

    fn current_state(&self) -> Result<ResourceState> {
        self.validate()?;
        let state = self.server.client.distro_state(&self.spec.distro())?;
        let Some(report) = state.report() else {
            return Ok(ResourceState::Absent);
        };
        if self.spec.ensure == Ensure::Absent {
            return Ok(ResourceState::Present { details: None });
        }

        let pending = self.pending_artifacts(Some(report), false)?;
        if pending.is_empty() {
            return Ok(ResourceState::Present { details: None });
        }
        let from = pending
            .iter()
            .map(|p| format!("{} {}", p.artifact, p.reason))
            .collect::<Vec<_>>()
            .join(", ");
        let to = pending
            .iter()
            .map(|p| p.artifact.to_string())
            .collect::<Vec<_>>()
            .join(" and ")
            + " updated";
        Ok(ResourceState::Modified { from, to })
    }

    fn desired_state(&self) -> ResourceState {
        match self.spec.ensure {
            Ensure::Present => ResourceState::Present { details: None },
            Ensure::Absent => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        self.validate()?;
        match self.spec.ensure {
            Ensure::Present => self.ensure_present(ctx),
            Ensure::Absent => self.ensure_absent(ctx),
        }
    }
}
