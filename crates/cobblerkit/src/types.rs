//! Core types for Cobbler objects.

use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered `key=value` options (kernel options, kickstart metadata).
///
/// Keys are kept sorted so rendered command lines are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionMap(BTreeMap<String, String>);

impl OptionMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option fluently.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value of an option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Render as space-joined `key=value` tokens.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for OptionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// OS family as classified by Cobbler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Breed {
    /// Red Hat family (kickstart)
    Redhat,
    /// Debian (preseed)
    Debian,
    /// Ubuntu (preseed)
    Ubuntu,
    /// SUSE (autoyast)
    Suse,
    /// Any breed without a known answer-file convention
    Other(String),
}

impl Breed {
    /// Name as used by Cobbler.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Redhat => "redhat",
            Self::Debian => "debian",
            Self::Ubuntu => "ubuntu",
            Self::Suse => "suse",
            Self::Other(s) => s,
        }
    }

    /// File extension of the answer file (kickstart, preseed, autoyast).
    pub fn kickstart_extension(&self) -> Option<&'static str> {
        match self {
            Self::Redhat => Some("ks"),
            Self::Debian | Self::Ubuntu => Some("preseed"),
            Self::Suse => Some("xml"),
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for Breed {
    fn from(s: &str) -> Self {
        match s.trim() {
            "redhat" => Self::Redhat,
            "debian" => Self::Debian,
            "ubuntu" => Self::Ubuntu,
            "suse" => Self::Suse,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Breed {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Breed> for String {
    fn from(breed: Breed) -> Self {
        breed.as_str().to_string()
    }
}

impl fmt::Display for Breed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boot artifact that can be replaced on an existing distro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Kernel image
    Kernel,
    /// Initial ramdisk
    Initrd,
}

impl Artifact {
    /// Label of the field in `cobbler distro report`.
    pub fn report_label(&self) -> &'static str {
        match self {
            Self::Kernel => "Kernel",
            Self::Initrd => "Initrd",
        }
    }

    /// Flag used by `cobbler distro edit`.
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Kernel => "--kernel",
            Self::Initrd => "--initrd",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kernel => write!(f, "kernel"),
            Self::Initrd => write!(f, "initrd"),
        }
    }
}

/// State of an object as reported by Cobbler.
///
/// Recomputed on every query; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectState {
    /// Not known to Cobbler
    Absent,
    /// Known, with its parsed report
    Present(Report),
}

impl ObjectState {
    /// Whether the object exists.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Whether the object does not exist.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Parsed report of a present object.
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Present(report) => Some(report),
            Self::Absent => None,
        }
    }
}

/// Captured output of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// Whether the command exited 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
