//! Rendering of `cobbler` command lines.
//!
//! Every touchpoint with the Cobbler CLI is built here, so the exact flag
//! grammar lives in one place and command lines are reproducible in tests.

use crate::types::{Artifact, Breed, OptionMap};
use std::fmt;

/// Arguments of a single `cobbler` invocation (without the program name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CobblerCommand {
    args: Vec<String>,
}

/// Arguments for `cobbler import`.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct ImportArgs<'a> {
    /// Image name; Cobbler appends `-<arch>` for the distro
    pub name: &'a str,
    /// Mounted installation tree
    pub path: &'a str,
    pub breed: &'a Breed,
    pub arch: &'a str,
    pub os_version: Option<&'a str>,
}

/// Arguments for `cobbler distro edit` replacing one boot artifact.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct DistroEditArgs<'a> {
    pub distro: &'a str,
    /// Which artifact `path` replaces
    pub artifact: Artifact,
    /// Installed artifact path
    pub path: &'a str,
    pub breed: &'a Breed,
    pub arch: &'a str,
    pub os_version: Option<&'a str>,
}

/// Arguments for `cobbler profile add`.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct ProfileAddArgs<'a> {
    pub name: &'a str,
    pub distro: &'a str,
    /// Absolute path of the installed answer file
    pub kickstart: &'a str,
    pub kernel_options: &'a OptionMap,
    pub kernel_options_post: &'a OptionMap,
    pub kickstart_meta: &'a OptionMap,
}

impl CobblerCommand {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn push_opt(&mut self, flag: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.args.push(format!("{flag}={v}"));
        }
    }

    fn push_map(&mut self, flag: &str, map: &OptionMap) {
        if !map.is_empty() {
            self.args.push(format!("{flag}={}", map.render()));
        }
    }

    /// Arguments passed to the executable.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `cobbler distro report --name=<name>`
    pub fn distro_report(name: &str) -> Self {
        Self::new(["distro".to_string(), "report".to_string(), format!("--name={name}")])
    }

    /// `cobbler distro edit --name=<distro> --kernel|--initrd=<path> ...`
    pub fn distro_edit(edit: &DistroEditArgs<'_>) -> Self {
        let mut cmd = Self::new([
            "distro".to_string(),
            "edit".to_string(),
            format!("--name={}", edit.distro),
            format!("{}={}", edit.artifact.flag(), edit.path),
            format!("--breed={}", edit.breed),
            format!("--arch={}", edit.arch),
        ]);
        cmd.push_opt("--os-version", edit.os_version);
        cmd
    }

    /// `cobbler distro remove --name=<name>`
    pub fn distro_remove(name: &str) -> Self {
        Self::new(["distro".to_string(), "remove".to_string(), format!("--name={name}")])
    }

    /// `cobbler import --name=<name> --path=<path> --breed=<b> --arch=<a> [--os-version=<v>]`
    pub fn import(import: &ImportArgs<'_>) -> Self {
        let mut cmd = Self::new([
            "import".to_string(),
            format!("--name={}", import.name),
            format!("--path={}", import.path),
            format!("--breed={}", import.breed),
            format!("--arch={}", import.arch),
        ]);
        cmd.push_opt("--os-version", import.os_version);
        cmd
    }

    /// `cobbler profile find --name=<name> --distro=<distro>`
    pub fn profile_find(name: &str, distro: &str) -> Self {
        Self::new([
            "profile".to_string(),
            "find".to_string(),
            format!("--name={name}"),
            format!("--distro={distro}"),
        ])
    }

    /// `cobbler profile add --name=<n> --clobber --distro=<d> --kickstart=<path> [maps]`
    ///
    /// Option-map flags are omitted when the map is empty.
    pub fn profile_add(add: &ProfileAddArgs<'_>) -> Self {
        let mut cmd = Self::new([
            "profile".to_string(),
            "add".to_string(),
            format!("--name={}", add.name),
            "--clobber".to_string(),
            format!("--distro={}", add.distro),
            format!("--kickstart={}", add.kickstart),
        ]);
        cmd.push_map("--kopts", add.kernel_options);
        cmd.push_map("--kopts-post", add.kernel_options_post);
        cmd.push_map("--ksmeta", add.kickstart_meta);
        cmd
    }

    /// `cobbler profile remove --name=<name>`
    pub fn profile_remove(name: &str) -> Self {
        Self::new(["profile".to_string(), "remove".to_string(), format!("--name={name}")])
    }

    /// `cobbler sync`
    pub fn sync() -> Self {
        Self::new(["sync"])
    }
}

impl fmt::Display for CobblerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cobbler")?;
        for arg in &self.args {
            write!(f, " {}", quote_arg(arg))?;
        }
        Ok(())
    }
}

/// Quote the value part of an argument for display when it contains spaces.
fn quote_arg(arg: &str) -> String {
    if !arg.contains(' ') {
        return arg.to_string();
    }
    match arg.split_once('=') {
        Some((flag, value)) => format!("{flag}='{value}'"),
        None => format!("'{arg}'"),
    }
}
