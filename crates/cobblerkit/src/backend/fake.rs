//! In-memory Cobbler for tests.
//!
//! Understands the subset of the CLI grammar rendered by
//! [`CobblerCommand`](crate::command::CobblerCommand), keeps distros and
//! profiles in memory, and records every invocation so tests can assert which
//! commands ran.

use crate::backend::Backend;
use crate::command::CobblerCommand;
use crate::error::Result;
use crate::types::CommandOutput;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    /// distro name -> report fields
    distros: BTreeMap<String, BTreeMap<String, String>>,
    /// profile name -> distro
    profiles: BTreeMap<String, String>,
    /// Rendered invocations, without the program name for cobbler commands
    calls: Vec<String>,
    /// Commands starting with one of these prefixes exit 1
    failing: Vec<String>,
    /// Mutations exit 0 but leave state unchanged
    frozen: bool,
}

/// Scriptable in-memory stand-in for the `cobbler` executable.
#[derive(Debug, Default)]
pub struct FakeCobbler {
    state: Mutex<State>,
}

impl FakeCobbler {
    /// Empty Cobbler: no distros, no profiles.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register an existing distro with the given breed.
    pub fn with_distro(self, name: &str, breed: &str) -> Self {
        {
            let mut state = self.lock();
            let fields = state.distros.entry(name.to_string()).or_default();
            fields.insert("Name".to_string(), name.to_string());
            fields.insert("Breed".to_string(), breed.to_string());
        }
        self
    }

    /// Set one report field of an existing distro.
    pub fn with_distro_field(self, name: &str, label: &str, value: &str) -> Self {
        {
            let mut state = self.lock();
            let fields = state.distros.entry(name.to_string()).or_default();
            fields.insert("Name".to_string(), name.to_string());
            fields.insert(label.to_string(), value.to_string());
        }
        self
    }

    /// Register an existing profile.
    pub fn with_profile(self, name: &str, distro: &str) -> Self {
        self.lock()
            .profiles
            .insert(name.to_string(), distro.to_string());
        self
    }

    /// Make every command starting with `prefix` (e.g. `"sync"`, `"profile add"`) exit 1.
    pub fn fail_on(self, prefix: &str) -> Self {
        self.lock().failing.push(prefix.to_string());
        self
    }

    /// Accept mutations without applying them.
    pub fn frozen(self) -> Self {
        self.lock().frozen = true;
        self
    }

    /// Every invocation so far.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of invocations starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Invocations that changed (or would have changed) Cobbler state.
    pub fn mutations(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| !c.starts_with("distro report") && !c.starts_with("profile find"))
            .cloned()
            .collect()
    }

    /// Whether a distro is registered.
    pub fn has_distro(&self, name: &str) -> bool {
        self.lock().distros.contains_key(name)
    }

    /// Whether a profile is registered.
    pub fn has_profile(&self, name: &str) -> bool {
        self.lock().profiles.contains_key(name)
    }

    /// Current value of a distro report field.
    pub fn distro_field(&self, name: &str, label: &str) -> Option<String> {
        self.lock()
            .distros
            .get(name)
            .and_then(|fields| fields.get(label).cloned())
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{name}=");
    args.iter().find_map(|a| a.strip_prefix(&prefix))
}

fn render_report(fields: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    if let Some(name) = fields.get("Name") {
        out.push_str(&format!("{:<30} : {name}\n", "Name"));
    }
    for (label, value) in fields.iter().filter(|(l, _)| *l != "Name") {
        out.push_str(&format!("{label:<30} : {value}\n"));
    }
    out
}

impl Backend for FakeCobbler {
    fn run(&self, command: &CobblerCommand) -> Result<CommandOutput> {
        let args = command.args();
        let line = args.join(" ");
        let mut state = self.lock();
        state.calls.push(line.clone());

        if state.failing.iter().any(|p| line.starts_with(p.as_str())) {
            return Ok(CommandOutput::failed(1, format!("simulated failure: {line}")));
        }

        let verb: Vec<&str> = args.iter().take(2).map(String::as_str).collect();
        let name = flag(args, "--name").unwrap_or_default().to_string();
        let frozen = state.frozen;

        let output = match verb.as_slice() {
            ["distro", "report"] => match state.distros.get(&name) {
                Some(fields) => CommandOutput::ok(render_report(fields)),
                None => CommandOutput::failed(1, format!("No distro found: {name}")),
            },
            ["profile", "find"] => {
                let distro = flag(args, "--distro").unwrap_or_default();
                match state.profiles.get(&name) {
                    Some(d) if d == distro => CommandOutput::ok(format!("{name}\n")),
                    _ => CommandOutput::ok(""),
                }
            }
            ["import", ..] => {
                let arch = flag(args, "--arch").unwrap_or("x86_64");
                let distro = format!("{name}-{arch}");
                if !frozen {
                    let mut fields = BTreeMap::new();
                    fields.insert("Name".to_string(), distro.clone());
                    fields.insert("Architecture".to_string(), arch.to_string());
                    fields.insert(
                        "Breed".to_string(),
                        flag(args, "--breed").unwrap_or_default().to_string(),
                    );
                    let tree = format!("/var/www/cobbler/ks_mirror/{distro}/images/pxeboot");
                    fields.insert("Kernel".to_string(), format!("{tree}/vmlinuz"));
                    fields.insert("Initrd".to_string(), format!("{tree}/initrd.img"));
                    state.distros.insert(distro, fields);
                }
                CommandOutput::ok("*** TASK COMPLETE ***\n")
            }
            ["distro", "edit"] => {
                if !state.distros.contains_key(&name) {
                    CommandOutput::failed(1, format!("object not found: {name}"))
                } else {
                    if !frozen && let Some(fields) = state.distros.get_mut(&name) {
                        for (flag_name, label) in [("--kernel", "Kernel"), ("--initrd", "Initrd")]
                        {
                            if let Some(path) = flag(args, flag_name) {
                                fields.insert(label.to_string(), path.to_string());
                            }
                        }
                    }
                    CommandOutput::ok("")
                }
            }
            ["distro", "remove"] => {
                if !frozen {
                    state.distros.remove(&name);
                }
                CommandOutput::ok("")
            }
            ["profile", "add"] => {
                let distro = flag(args, "--distro").unwrap_or_default().to_string();
                if !state.distros.contains_key(&distro) {
                    CommandOutput::failed(1, format!("distribution not found: {distro}"))
                } else {
                    if !frozen {
                        state.profiles.insert(name, distro);
                    }
                    CommandOutput::ok("")
                }
            }
            ["profile", "remove"] => {
                if !frozen {
                    state.profiles.remove(&name);
                }
                CommandOutput::ok("")
            }
            ["sync", ..] => CommandOutput::ok("*** TASK COMPLETE ***\n"),
            _ => CommandOutput::failed(2, format!("usage: unsupported command {line}")),
        };

        Ok(output)
    }

    fn run_host(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = format!("{program} {}", args.join(" "));
        let mut state = self.lock();
        state.calls.push(line.clone());
        if state.failing.iter().any(|p| line.starts_with(p.as_str())) {
            return Ok(CommandOutput::failed(32, format!("simulated failure: {line}")));
        }
        Ok(CommandOutput::ok(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_for_registered_distro() {
        let fake = FakeCobbler::new().with_distro("centos7-x86_64", "redhat");
        let out = fake
            .run(&CobblerCommand::distro_report("centos7-x86_64"))
            .unwrap();
        assert!(out.success());
        assert!(out.stdout.contains("redhat"));
        assert_eq!(fake.calls(), vec!["distro report --name=centos7-x86_64"]);
    }

    #[test]
    fn test_report_for_unknown_distro_fails() {
        let fake = FakeCobbler::new();
        let out = fake.run(&CobblerCommand::distro_report("nope")).unwrap();
        assert_eq!(out.exit_code, Some(1));
    }

    #[test]
    fn test_fail_on_prefix() {
        let fake = FakeCobbler::new().fail_on("sync");
        let out = fake.run(&CobblerCommand::sync()).unwrap();
        assert!(!out.success());
        assert_eq!(fake.count("sync"), 1);
    }
}
