//! Idempotent orchestration of Cobbler objects
//!
//! Every object goes through query -> decide -> act -> verify. Mutations
//! queue a `cobbler sync`, which runs once after the whole batch.

use anyhow::Result;
use cobblerkit::naming::{self, Validation};
use cobblerkit::{Client, ReservedWords};
use declarative::{
    ApplyContext, ApplyResult, BoxedResource, DeferredAction, DeferredRunner, ExecuteOptions,
    ExecuteSummary, ExecutionPlan, ProgressCallback, run_batch,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Paths};
use crate::resource::{Image, ObjectSpec, Profile};

/// A Cobbler server: how to reach it and where its files live
pub struct Server {
    pub client: Client,
    pub paths: Paths,
    pub reserved_words: ReservedWords,
}

impl Server {
    pub fn new(client: Client, paths: Paths, reserved_words: ReservedWords) -> Self {
        Self {
            client,
            paths,
            reserved_words,
        }
    }

    /// Server driven through the configured cobbler executable
    pub fn from_config(config: &Config) -> Self {
        let client = Client::new(
            config.cobbler.bin.clone(),
            Duration::from_secs(config.cobbler.timeout_secs),
        );
        Self::new(
            client,
            config.paths.resolve(),
            config.reserved_words.clone(),
        )
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// Runs deferred actions against the server
pub struct CobblerSync<'a> {
    client: &'a Client,
}

impl<'a> CobblerSync<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

impl DeferredRunner for CobblerSync<'_> {
    fn run(&mut self, action: DeferredAction) -> Result<()> {
        match action {
            DeferredAction::Sync => self.client.sync()?,
        }
        Ok(())
    }
}

/// Check an image name against the configured reserved words
pub fn validate_name(server: &Server, name: &str) -> Validation {
    naming::validate(name, &server.reserved_words)
}

/// Resource for a declared object
pub fn resource(server: &Arc<Server>, spec: ObjectSpec) -> BoxedResource {
    match spec {
        ObjectSpec::Image(spec) => Box::new(Image::new(spec, Arc::clone(server))),
        ObjectSpec::Profile(spec) => Box::new(Profile::new(spec, Arc::clone(server))),
    }
}

/// Bring one object to its declared state
///
/// Deferred actions are queued on `ctx`; the caller flushes them.
pub fn reconcile(
    server: &Arc<Server>,
    spec: &ObjectSpec,
    ctx: &mut ApplyContext,
) -> Result<ApplyResult> {
    resource(server, spec.clone()).apply(ctx)
}

/// Remove one object; a no-op when it does not exist
pub fn delete(
    server: &Arc<Server>,
    spec: &ObjectSpec,
    ctx: &mut ApplyContext,
) -> Result<ApplyResult> {
    reconcile(server, &spec.clone().into_absent(), ctx)
}

/// Every declared object, images before the profiles that use them
pub fn build_plan(server: &Arc<Server>, config: &Config) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    for image in &config.images {
        plan.add_resource(resource(server, ObjectSpec::Image(image.clone())));
    }
    for profile in &config.profiles {
        plan.add_resource(resource(server, ObjectSpec::Profile(profile.clone())));
    }
    plan
}

/// Apply a batch and sync once if anything queued a sync
pub fn apply<P: ProgressCallback>(
    server: &Server,
    resources: &[BoxedResource],
    opts: &ExecuteOptions,
    progress: &mut P,
) -> ExecuteSummary {
    let mut runner = CobblerSync::new(&server.client);
    run_batch(resources, opts, &mut runner, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ImageSpec, ProfileSpec};
    use cobblerkit::backend::FakeCobbler;
    use cobblerkit::{Breed, Error as CobblerError};
    use declarative::NoProgress;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    struct Fixture {
        dir: TempDir,
        server: Arc<Server>,
        fake: Arc<FakeCobbler>,
    }

    impl Fixture {
        fn new(fake: FakeCobbler) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let fake = Arc::new(fake);
            let paths = Paths {
                file_cache: dir.path().join("cache"),
                kickstart_dir: dir.path().join("kickstarts"),
                tftp_images_dir: dir.path().join("images"),
            };
            let server = Server::new(
                Client::with_backend(Box::new(Arc::clone(&fake))),
                paths,
                ReservedWords::default(),
            );
            Self {
                dir,
                server: Arc::new(server),
                fake,
            }
        }

        /// Write a file under the fixture directory and return its path
        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            path
        }

        fn image(&self, name: &str) -> ImageSpec {
            let iso = self.file(&format!("src/{name}.iso"), "iso\n");
            ImageSpec {
                source: Some(iso.to_string_lossy().into_owned()),
                os_breed: Some(Breed::Redhat),
                os_version: Some("rhel7".into()),
                ..ImageSpec::new(name, "x86_64")
            }
        }

        fn reconcile(&self, spec: ObjectSpec) -> Result<ApplyResult> {
            let mut ctx = ApplyContext::default();
            reconcile(&self.server, &spec, &mut ctx)
        }

        fn apply(&self, specs: Vec<ObjectSpec>) -> ExecuteSummary {
            let resources: Vec<_> = specs
                .into_iter()
                .map(|s| resource(&self.server, s))
                .collect();
            apply(
                &self.server,
                &resources,
                &ExecuteOptions::default(),
                &mut NoProgress,
            )
        }
    }

    fn cobbler_error(err: &anyhow::Error) -> &CobblerError {
        err.downcast_ref::<CobblerError>()
            .unwrap_or_else(|| panic!("not a cobbler error: {err:#}"))
    }

    #[test]
    fn test_validate_name() {
        let fx = Fixture::new(FakeCobbler::new());
        assert!(validate_name(&fx.server, "web01").is_valid());
        let offenses: Vec<_> = validate_name(&fx.server, "ks_mirror-test")
            .offenses()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(offenses.contains(&"ks_mirror-".to_string()));
    }

    #[test]
    fn test_import_new_image() {
        let fx = Fixture::new(FakeCobbler::new());
        let spec = fx.image("centos7");
        let iso_target = fx.dir.path().join("cache/centos7.iso");

        let mut ctx = ApplyContext::default();
        let result = reconcile(&fx.server, &ObjectSpec::Image(spec), &mut ctx).unwrap();

        assert_eq!(result, ApplyResult::Created);
        assert!(fx.fake.has_distro("centos7-x86_64"));
        assert!(!iso_target.exists(), "fetched ISO is removed after import");
        assert!(!fx.dir.path().join("cache/mnt").exists());
        assert!(ctx.deferred().contains(DeferredAction::Sync));

        let calls = fx.fake.calls();
        let mount = format!(
            "mount -o loop,ro {} {}",
            iso_target.display(),
            fx.dir.path().join("cache/mnt").display()
        );
        assert!(calls.contains(&mount), "{calls:?}");
        assert!(calls.iter().any(|c| c.starts_with(
            "import --name=centos7 --path="
        )));
        assert_eq!(fx.fake.count("umount"), 1);
        assert_eq!(fx.fake.count("sync"), 0, "sync is deferred");
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let fx = Fixture::new(FakeCobbler::new());
        let spec = ObjectSpec::Image(fx.image("centos7"));

        assert_eq!(fx.reconcile(spec.clone()).unwrap(), ApplyResult::Created);
        let mutations = fx.fake.mutations().len();

        assert_eq!(fx.reconcile(spec).unwrap(), ApplyResult::NoChange);
        assert_eq!(fx.fake.mutations().len(), mutations);
    }

    #[test]
    fn test_failed_import_still_unmounts() {
        let fx = Fixture::new(FakeCobbler::new().fail_on("import"));
        let err = fx
            .reconcile(ObjectSpec::Image(fx.image("centos7")))
            .unwrap_err();

        assert!(matches!(cobbler_error(&err), CobblerError::ActionFailed { .. }));
        assert_eq!(fx.fake.count("umount"), 1);
        assert!(!fx.fake.has_distro("centos7-x86_64"));
    }

    #[test]
    fn test_failed_unmount_after_import_still_syncs() {
        let fx = Fixture::new(FakeCobbler::new().fail_on("umount"));
        let spec = ObjectSpec::Image(fx.image("centos7"));

        let summary = fx.apply(vec![spec.clone()]);
        assert_eq!(summary.failed, 1);
        assert!(fx.fake.has_distro("centos7-x86_64"));
        assert_eq!(fx.fake.count("sync"), 1);

        let summary = fx.apply(vec![spec]);
        assert_eq!(summary.no_change, 1);
        assert_eq!(fx.fake.count("sync"), 1);
    }

    #[test]
    fn test_iso_checksum_mismatch_aborts_before_mount() {
        let fx = Fixture::new(FakeCobbler::new());
        let spec = ImageSpec {
            checksum: Some("0".repeat(64)),
            ..fx.image("centos7")
        };
        let err = fx.reconcile(ObjectSpec::Image(spec)).unwrap_err();

        assert!(matches!(
            cobbler_error(&err),
            CobblerError::ChecksumMismatch { .. }
        ));
        assert_eq!(fx.fake.count("mount"), 0);
    }

    #[test]
    fn test_invalid_name_makes_no_calls() {
        let fx = Fixture::new(FakeCobbler::new());
        let err = fx
            .reconcile(ObjectSpec::Image(fx.image("ks_mirror-test")))
            .unwrap_err();

        match cobbler_error(&err) {
            CobblerError::InvalidName { offenses, .. } => {
                assert!(offenses.iter().any(|o| o.as_str() == "ks_mirror-"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fx.fake.calls().is_empty());
    }

    /// Existing distro whose kernel report field points at a local file
    fn with_installed_kernel(fx: &Fixture, content: &str) -> PathBuf {
        let installed = fx.file("installed/vmlinuz", content);
        fx.fake_kernel(&installed);
        installed
    }

    impl Fixture {
        fn fake_kernel(&self, path: &Path) {
            // FakeCobbler is built before the fixture directory exists, so the
            // kernel path is set through a `distro edit`.
            let breed = Breed::Redhat;
            let path = path.to_string_lossy();
            self.server
                .client
                .edit_distro_artifact(&cobblerkit::DistroEditArgs {
                    distro: "centos7-x86_64",
                    artifact: cobblerkit::Artifact::Kernel,
                    path: &path,
                    breed: &breed,
                    arch: "x86_64",
                    os_version: None,
                })
                .unwrap();
        }

        fn kernel_spec(&self, checksum: Option<&str>) -> ObjectSpec {
            let source = self.file("src/vmlinuz", "hello\n");
            ObjectSpec::Image(ImageSpec {
                kernel: Some(source.to_string_lossy().into_owned()),
                kernel_checksum: checksum.map(ToString::to_string),
                ..self.image("centos7")
            })
        }
    }

    #[test]
    fn test_kernel_checksum_match_does_not_act() {
        let fx = Fixture::new(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        with_installed_kernel(&fx, "hello\n");
        let before = fx.fake.mutations().len();

        let result = fx.reconcile(fx.kernel_spec(Some(HELLO_SHA256))).unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(fx.fake.mutations().len(), before);
    }

    #[test]
    fn test_kernel_checksum_mismatch_updates() {
        let fx = Fixture::new(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        with_installed_kernel(&fx, "old\n");
        let spec = fx.kernel_spec(Some(HELLO_SHA256));

        assert_eq!(fx.reconcile(spec.clone()).unwrap(), ApplyResult::Modified);

        let managed = fx.dir.path().join("images/centos7-x86_64/vmlinuz");
        assert_eq!(fs::read_to_string(&managed).unwrap(), "hello\n");
        assert_eq!(
            fx.fake.distro_field("centos7-x86_64", "Kernel"),
            Some(managed.to_string_lossy().into_owned())
        );

        // The managed copy now matches.
        assert_eq!(fx.reconcile(spec).unwrap(), ApplyResult::NoChange);
    }

    #[test]
    fn test_kernel_without_checksum_always_updates() {
        let fx = Fixture::new(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        with_installed_kernel(&fx, "hello\n");
        let spec = fx.kernel_spec(None);

        assert_eq!(fx.reconcile(spec.clone()).unwrap(), ApplyResult::Modified);
        assert_eq!(fx.reconcile(spec).unwrap(), ApplyResult::Modified);
        assert_eq!(fx.fake.count("distro edit"), 3);
    }

    #[test]
    fn test_new_distro_installs_configured_kernel() {
        let fx = Fixture::new(FakeCobbler::new());
        let result = fx.reconcile(fx.kernel_spec(Some(HELLO_SHA256))).unwrap();

        assert_eq!(result, ApplyResult::Created);
        assert_eq!(fx.fake.count("import"), 1);
        assert_eq!(fx.fake.count("distro edit --name=centos7-x86_64 --kernel="), 1);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let fx = Fixture::new(FakeCobbler::new());
        let mut ctx = ApplyContext::default();
        let spec = ObjectSpec::Image(ImageSpec::new("centos7", "x86_64"));

        let result = delete(&fx.server, &spec, &mut ctx).unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert!(fx.fake.mutations().is_empty());
        assert!(ctx.deferred().is_empty());
    }

    #[test]
    fn test_delete_present_image() {
        let fx = Fixture::new(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        let mut ctx = ApplyContext::default();
        let spec = ObjectSpec::Image(ImageSpec::new("centos7", "x86_64"));

        let result = delete(&fx.server, &spec, &mut ctx).unwrap();

        assert_eq!(result, ApplyResult::Removed);
        assert!(!fx.fake.has_distro("centos7-x86_64"));
        assert_eq!(fx.fake.count("distro remove --name=centos7-x86_64"), 1);
        assert!(ctx.deferred().contains(DeferredAction::Sync));
    }

    #[test]
    fn test_delete_fails_verification_when_object_remains() {
        let fx = Fixture::new(
            FakeCobbler::new()
                .with_distro("centos7-x86_64", "redhat")
                .frozen(),
        );
        let mut ctx = ApplyContext::default();
        let spec = ObjectSpec::Image(ImageSpec::new("centos7", "x86_64"));

        let err = delete(&fx.server, &spec, &mut ctx).unwrap_err();

        assert!(matches!(
            cobbler_error(&err),
            CobblerError::VerifyFailed { .. }
        ));
        assert_eq!(fx.fake.count("distro remove"), 1);
    }

    #[test]
    fn test_profile_lifecycle() {
        let fx = Fixture::new(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        let kickstart_source = fx.file("src/web.ks", "install\n");
        let spec = ObjectSpec::Profile(ProfileSpec {
            kickstart_source: Some(kickstart_source.to_string_lossy().into_owned()),
            ..ProfileSpec::new("web", "centos7-x86_64")
        });
        let kickstart = fx.dir.path().join("kickstarts/web.ks");

        assert_eq!(fx.reconcile(spec.clone()).unwrap(), ApplyResult::Created);
        assert!(fx.fake.has_profile("web"));
        assert_eq!(fs::read_to_string(&kickstart).unwrap(), "install\n");
        let add = format!(
            "profile add --name=web --clobber --distro=centos7-x86_64 --kickstart={} --kopts=interface=auto",
            kickstart.display()
        );
        assert!(fx.fake.calls().contains(&add), "{:?}", fx.fake.calls());

        assert_eq!(fx.reconcile(spec.clone()).unwrap(), ApplyResult::NoChange);
        assert_eq!(fx.fake.count("profile add"), 1);

        let mut ctx = ApplyContext::default();
        assert_eq!(
            delete(&fx.server, &spec, &mut ctx).unwrap(),
            ApplyResult::Removed
        );
        assert!(!fx.fake.has_profile("web"));
        assert!(!kickstart.exists());
    }

    #[test]
    fn test_delete_absent_profile_removes_leftover_kickstart() {
        let fx = Fixture::new(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        let kickstart = fx.file("kickstarts/web.ks", "install\n");
        let spec = ObjectSpec::Profile(ProfileSpec::new("web", "centos7-x86_64"));

        let mut ctx = ApplyContext::new(true, false);
        assert!(matches!(
            delete(&fx.server, &spec, &mut ctx).unwrap(),
            ApplyResult::NoChange
        ));
        assert!(kickstart.exists(), "dry run keeps the file");

        let mut ctx = ApplyContext::default();
        assert_eq!(
            delete(&fx.server, &spec, &mut ctx).unwrap(),
            ApplyResult::NoChange
        );
        assert!(!kickstart.exists());
        assert!(fx.fake.mutations().is_empty());
        assert!(ctx.deferred().is_empty());
    }

    #[test]
    fn test_profile_for_missing_distro_fails() {
        let fx = Fixture::new(FakeCobbler::new());
        let spec = ObjectSpec::Profile(ProfileSpec {
            kickstart: Some("web.ks".into()),
            ..ProfileSpec::new("web", "centos7-x86_64")
        });
        let err = fx.reconcile(spec).unwrap_err();
        assert!(matches!(
            cobbler_error(&err),
            CobblerError::ActionFailed { .. }
        ));
    }

    #[test]
    fn test_sync_runs_once_per_batch() {
        let fx = Fixture::new(FakeCobbler::new());
        let summary = fx.apply(vec![
            ObjectSpec::Image(fx.image("centos7")),
            ObjectSpec::Image(fx.image("trusty")),
            ObjectSpec::Profile(ProfileSpec {
                kickstart: Some("web.ks".into()),
                ..ProfileSpec::new("web", "centos7-x86_64")
            }),
        ]);

        assert_eq!(summary.created, 3);
        assert_eq!(summary.deferred, 1);
        assert_eq!(fx.fake.count("sync"), 1);
        assert_eq!(fx.fake.calls().last().map(String::as_str), Some("sync"));
    }

    #[test]
    fn test_converged_batch_does_not_sync() {
        let fx = Fixture::new(
            FakeCobbler::new()
                .with_distro("centos7-x86_64", "redhat")
                .with_profile("web", "centos7-x86_64"),
        );
        let summary = fx.apply(vec![
            ObjectSpec::Image(fx.image("centos7")),
            ObjectSpec::Profile(ProfileSpec::new("web", "centos7-x86_64")),
        ]);

        assert_eq!(summary.no_change, 2);
        assert_eq!(fx.fake.count("sync"), 0);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let fx = Fixture::new(FakeCobbler::new().fail_on("import --name=centos6"));
        let summary = fx.apply(vec![
            ObjectSpec::Image(fx.image("centos6")),
            ObjectSpec::Image(fx.image("centos7")),
        ]);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        assert!(!summary.is_success());
        assert_eq!(fx.fake.count("sync"), 1);
    }

    #[test]
    fn test_build_plan_orders_images_first() {
        let fx = Fixture::new(FakeCobbler::new());
        let config = Config::parse(
            r#"
[[profile]]
name = "web"
distro = "centos7-x86_64"

[[image]]
name = "centos7"
source = "/srv/centos7.iso"
os_breed = "redhat"
"#,
        )
        .unwrap();
        let plan = build_plan(&fx.server, &config);
        let ids: Vec<_> = plan.resources.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["centos7-x86_64", "web"]);
    }
}
