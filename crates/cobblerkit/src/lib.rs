//! # cobblerkit
//!
//! Typed wrapper around the Cobbler command-line interface.
//!
//! This crate provides:
//! - Validation of object names against strings Cobbler rewrites on import
//! - Rendering of every `cobbler` invocation the orchestrator uses
//! - Parsing of `cobbler <type> report` output
//! - Query/act/verify primitives with a distinct error for each failure mode
//! - Fetching and checksumming of installation media and boot artifacts
//!
//! ## Example
//!
//! ```no_run
//! use cobblerkit::{Client, Expectation};
//! use std::time::Duration;
//!
//! let client = Client::new("cobbler", Duration::from_secs(600));
//!
//! if client.distro_state("centos7-x86_64")?.is_absent() {
//!     println!("not imported yet");
//! }
//!
//! client.remove_profile("web")?;
//! client.verify_profile("web", "centos7-x86_64", Expectation::Absent)?;
//! client.sync()?;
//! # Ok::<(), cobblerkit::Error>(())
//! ```
//!
//! ## Name validation
//!
//! ```
//! use cobblerkit::naming::{validate, ReservedWords};
//!
//! let words = ReservedWords::default();
//! assert!(validate("web01", &words).is_valid());
//! assert!(!validate("ks_mirror-test", &words).is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod backend;
pub mod command;
pub mod error;
pub mod naming;
pub mod report;
pub mod types;

pub use command::{CobblerCommand, DistroEditArgs, ImportArgs, ProfileAddArgs};
pub use error::{Error, ErrorCategory, Expectation, Result};
pub use naming::{Offense, ReservedWords, Validation};
pub use report::Report;
pub use types::{Artifact, Breed, CommandOutput, ObjectState, OptionMap};

use backend::{Backend, CliBackend};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// High-level client for Cobbler operations.
///
/// Queries never mutate, mutations never re-query. Callers combine them into
/// query -> decide -> act -> verify sequences.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client running the given `cobbler` executable.
    pub fn new(cobbler_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            backend: Box::new(CliBackend::new(cobbler_path, timeout)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Run a read-only command. Only a failure to run it at all is an error.
    fn query(&self, command: &CobblerCommand) -> Result<CommandOutput> {
        let output = self
            .backend
            .run(command)
            .map_err(|e| Error::QueryFailed {
                command: command.to_string(),
                message: e.to_string(),
            })?;
        log::debug!("{command} -> exit {:?}", output.exit_code);
        Ok(output)
    }

    /// Run a mutating command. A non-zero exit is an error.
    fn act(&self, command: &CobblerCommand) -> Result<()> {
        log::info!("{command}");
        let output = self.backend.run(command)?;
        ensure_success(command.to_string(), output)
    }

    fn host(&self, program: &str, args: &[&str]) -> Result<()> {
        log::info!("{program} {}", args.join(" "));
        let output = self.backend.run_host(program, args)?;
        ensure_success(format!("{program} {}", args.join(" ")), output)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state of a distro.
    ///
    /// Present only when the report exits zero and names this distro; a
    /// non-zero exit, an empty report, or a report for another name is absent.
    pub fn distro_state(&self, name: &str) -> Result<ObjectState> {
        let output = self.query(&CobblerCommand::distro_report(name))?;
        if !output.success() {
            return Ok(ObjectState::Absent);
        }
        let report = Report::parse(&output.stdout);
        if report.get("Name") != Some(name) {
            log::debug!("distro report for {name} does not name it");
            return Ok(ObjectState::Absent);
        }
        Ok(ObjectState::Present(report))
    }

    /// One labeled field of a distro report.
    pub fn distro_field(&self, name: &str, label: &str) -> Result<String> {
        match self.distro_state(name)? {
            ObjectState::Present(report) => report.field(name, label).map(ToString::to_string),
            ObjectState::Absent => Err(Error::ObjectNotFound {
                object: format!("distro {name}"),
            }),
        }
    }

    /// Breed of an existing distro.
    pub fn distro_breed(&self, name: &str) -> Result<Breed> {
        self.distro_field(name, "Breed").map(Breed::from)
    }

    /// Whether a profile with exactly this name exists for the distro.
    pub fn profile_exists(&self, name: &str, distro: &str) -> Result<bool> {
        let output = self.query(&CobblerCommand::profile_find(name, distro))?;
        Ok(output.success() && output.stdout.lines().any(|line| line.trim() == name))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Import a mounted installation tree as a new distro.
    pub fn import(&self, args: &ImportArgs<'_>) -> Result<()> {
        self.act(&CobblerCommand::import(args))
    }

    /// Point a distro at a different kernel or initrd.
    pub fn edit_distro_artifact(&self, args: &DistroEditArgs<'_>) -> Result<()> {
        self.act(&CobblerCommand::distro_edit(args))
    }

    /// Remove a distro.
    pub fn remove_distro(&self, name: &str) -> Result<()> {
        self.act(&CobblerCommand::distro_remove(name))
    }

    /// Add (or clobber) a profile.
    pub fn add_profile(&self, args: &ProfileAddArgs<'_>) -> Result<()> {
        self.act(&CobblerCommand::profile_add(args))
    }

    /// Remove a profile.
    pub fn remove_profile(&self, name: &str) -> Result<()> {
        self.act(&CobblerCommand::profile_remove(name))
    }

    /// Write Cobbler's state out to the served boot artifacts.
    pub fn sync(&self) -> Result<()> {
        self.act(&CobblerCommand::sync())
    }

    /// Loop-mount an ISO read-only.
    pub fn mount_iso(&self, iso: &Path, mount_point: &Path) -> Result<()> {
        let iso = iso.to_string_lossy();
        let mnt = mount_point.to_string_lossy();
        self.host("mount", &["-o", "loop,ro", &iso, &mnt])
    }

    /// Unmount a previously mounted ISO.
    pub fn unmount(&self, mount_point: &Path) -> Result<()> {
        self.host("umount", &[&mount_point.to_string_lossy()])
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Re-query a distro and fail unless it is in the expected state.
    pub fn verify_distro(&self, name: &str, expected: Expectation) -> Result<()> {
        let present = self.distro_state(name)?.is_present();
        check(present, expected, || format!("distro {name}"))
    }

    /// Re-query a profile and fail unless it is in the expected state.
    pub fn verify_profile(&self, name: &str, distro: &str, expected: Expectation) -> Result<()> {
        let present = self.profile_exists(name, distro)?;
        check(present, expected, || format!("profile {name}"))
    }
}

fn ensure_success(command: String, output: CommandOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    Err(Error::ActionFailed {
        command,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

fn check(present: bool, expected: Expectation, object: impl FnOnce() -> String) -> Result<()> {
    let holds = match expected {
        Expectation::Present => present,
        Expectation::Absent => !present,
    };
    if holds {
        Ok(())
    } else {
        Err(Error::VerifyFailed {
            object: object(),
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::FakeCobbler;
    use std::sync::Arc;

    fn client(fake: FakeCobbler) -> (Client, Arc<FakeCobbler>) {
        let fake = Arc::new(fake);
        (Client::with_backend(Box::new(Arc::clone(&fake))), fake)
    }

    struct Unreachable;

    impl Backend for Unreachable {
        fn run(&self, command: &CobblerCommand) -> Result<CommandOutput> {
            Err(Error::Timeout {
                command: command.to_string(),
                seconds: 1,
            })
        }

        fn run_host(&self, program: &str, _args: &[&str]) -> Result<CommandOutput> {
            Err(Error::Timeout {
                command: program.to_string(),
                seconds: 1,
            })
        }
    }

    #[test]
    fn test_distro_state() {
        let (client, _) = client(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        assert!(client.distro_state("centos7-x86_64").unwrap().is_present());
        assert!(client.distro_state("trusty-x86_64").unwrap().is_absent());
    }

    /// Backend answering every cobbler command with the same output
    struct Canned(&'static str);

    impl Backend for Canned {
        fn run(&self, _command: &CobblerCommand) -> Result<CommandOutput> {
            Ok(CommandOutput::ok(self.0))
        }

        fn run_host(&self, _program: &str, _args: &[&str]) -> Result<CommandOutput> {
            Ok(CommandOutput::ok(""))
        }
    }

    #[test]
    fn test_zero_exit_without_matching_name_is_absent() {
        let client = Client::with_backend(Box::new(Canned("No distro found: centos7-x86_64\n")));
        assert!(client.distro_state("centos7-x86_64").unwrap().is_absent());

        let client = Client::with_backend(Box::new(Canned(
            "Name                           : trusty-x86_64\nBreed                          : ubuntu\n",
        )));
        assert!(client.distro_state("centos7-x86_64").unwrap().is_absent());
        assert!(client.distro_state("trusty-x86_64").unwrap().is_present());

        let client = Client::with_backend(Box::new(Canned("")));
        assert!(client.distro_state("centos7-x86_64").unwrap().is_absent());
    }

    #[test]
    fn test_unrunnable_query_is_not_absence() {
        let client = Client::with_backend(Box::new(Unreachable));
        let err = client.distro_state("centos7-x86_64").unwrap_err();
        assert!(matches!(err, Error::QueryFailed { .. }));
        assert_eq!(err.category(), ErrorCategory::Query);
    }

    #[test]
    fn test_distro_breed_and_missing_field() {
        let (client, _) = client(FakeCobbler::new().with_distro("trusty-x86_64", "ubuntu"));
        assert_eq!(client.distro_breed("trusty-x86_64").unwrap(), Breed::Ubuntu);
        let err = client.distro_field("trusty-x86_64", "OS Version").unwrap_err();
        assert!(matches!(err, Error::FieldNotFound { .. }));
        let err = client.distro_breed("missing-x86_64").unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[test]
    fn test_profile_exists_requires_exact_match() {
        let (client, _) = client(
            FakeCobbler::new()
                .with_distro("centos7-x86_64", "redhat")
                .with_profile("web", "centos7-x86_64"),
        );
        assert!(client.profile_exists("web", "centos7-x86_64").unwrap());
        assert!(!client.profile_exists("we", "centos7-x86_64").unwrap());
        assert!(!client.profile_exists("web", "trusty-x86_64").unwrap());
    }

    #[test]
    fn test_failed_action_keeps_output() {
        let (client, _) = client(FakeCobbler::new().fail_on("sync"));
        let err = client.sync().unwrap_err();
        match err {
            Error::ActionFailed {
                command,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(command, "cobbler sync");
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("simulated failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_verify_distro() {
        let (client, _) = client(FakeCobbler::new().with_distro("centos7-x86_64", "redhat"));
        client
            .verify_distro("centos7-x86_64", Expectation::Present)
            .unwrap();
        let err = client
            .verify_distro("centos7-x86_64", Expectation::Absent)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::VerifyFailed {
                expected: Expectation::Absent,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_then_verify_profile() {
        let (client, fake) = client(
            FakeCobbler::new()
                .with_distro("centos7-x86_64", "redhat")
                .with_profile("web", "centos7-x86_64"),
        );
        client.remove_profile("web").unwrap();
        client
            .verify_profile("web", "centos7-x86_64", Expectation::Absent)
            .unwrap();
        assert!(!fake.has_profile("web"));
    }

    #[test]
    fn test_mount_and_unmount_iso() {
        let (client, fake) = client(FakeCobbler::new());
        client
            .mount_iso(
                Path::new("/var/cache/cobblerd/centos7.iso"),
                Path::new("/var/cache/cobblerd/mnt"),
            )
            .unwrap();
        client.unmount(Path::new("/var/cache/cobblerd/mnt")).unwrap();
        assert_eq!(
            fake.calls(),
            vec![
                "mount -o loop,ro /var/cache/cobblerd/centos7.iso /var/cache/cobblerd/mnt",
                "umount /var/cache/cobblerd/mnt",
            ]
        );
    }
}
