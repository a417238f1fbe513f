//! Reserved-word checks for Cobbler object names.
//!
//! `cobbler import` silently rewrites names that contain certain path
//! fragments and architecture suffixes, so the distro it creates would not be
//! found again under the requested name. [`validate`] detects those strings
//! up front, using plain case-sensitive substring containment exactly like
//! Cobbler's own `name.replace(...)` calls. False positives (`-os` inside
//! `my-ostree`) are expected.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strings Cobbler strips from imported names.
///
/// Built once from configuration and passed explicitly to [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservedWords {
    /// Substrings that are forbidden anywhere in the name
    pub bare_words: Vec<String>,
    /// Architecture tokens, forbidden when preceded by a separator
    pub arch: Vec<String>,
    /// Separators that combine with an architecture token
    pub separators: Vec<String>,
}

impl Default for ReservedWords {
    fn default() -> Self {
        // grep -h 'name.replace' cobbler/modules/* | sort -u
        let bare_words = [
            "--",
            "-amd64",
            "-boot",
            "chrp",
            "-i386",
            "-images",
            "-install",
            "-isolinux",
            "ks_mirror-",
            "-loader",
            "-netboot",
            "-os",
            "-pxeboot",
            "srv-www-cobbler-",
            "-tree",
            "-ubuntu-installer",
            "var-www-cobbler-",
        ];
        let arch = [
            "i386", "x86_64", "ia64", "ppc64", "ppc32", "ppc", "x86", "s390x", "s390", "386",
            "amd", "arm",
        ];
        let separators = ["-", "_", "."];

        Self {
            bare_words: bare_words.iter().map(ToString::to_string).collect(),
            arch: arch.iter().map(ToString::to_string).collect(),
            separators: separators.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A single reason a name was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offense {
    /// The name is empty
    EmptyName,
    /// A configured bare word was found
    BareWord(String),
    /// A separator followed by an architecture token was found
    ArchToken(String),
}

impl Offense {
    /// The offending substring (or a marker for the empty name).
    pub fn as_str(&self) -> &str {
        match self {
            Self::EmptyName => "<empty name>",
            Self::BareWord(s) | Self::ArchToken(s) => s,
        }
    }
}

impl fmt::Display for Offense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    offenses: Vec<Offense>,
}

impl Validation {
    /// True when no offense was found.
    pub fn is_valid(&self) -> bool {
        self.offenses.is_empty()
    }

    /// Every offense, bare words first, then separator+arch combinations.
    pub fn offenses(&self) -> &[Offense] {
        &self.offenses
    }

    /// Convert into a `Result` so callers can refuse with `?`.
    pub fn into_result(self, name: &str) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidName {
                name: name.to_string(),
                offenses: self.offenses,
            })
        }
    }
}

/// Check `name` against the reserved words.
///
/// Returns every offense, not just the first one.
pub fn validate(name: &str, reserved: &ReservedWords) -> Validation {
    if name.is_empty() {
        return Validation {
            offenses: vec![Offense::EmptyName],
        };
    }

    let mut offenses: Vec<Offense> = reserved
        .bare_words
        .iter()
        .filter(|word| name.contains(word.as_str()))
        .map(|word| Offense::BareWord(word.clone()))
        .collect();

    for sep in &reserved.separators {
        for arch in &reserved.arch {
            let combined = format!("{sep}{arch}");
            if name.contains(&combined) {
                offenses.push(Offense::ArchToken(combined));
            }
        }
    }

    Validation { offenses }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &Validation) -> Vec<&str> {
        v.offenses().iter().map(Offense::as_str).collect()
    }

    #[test]
    fn test_ks_mirror_is_refused() {
        let v = validate("ks_mirror-test", &ReservedWords::default());
        assert!(!v.is_valid());
        assert!(strings(&v).contains(&"ks_mirror-"));
    }

    #[test]
    fn test_arch_with_separator_is_refused() {
        let v = validate("my-amd64-host", &ReservedWords::default());
        assert!(!v.is_valid());
        assert!(strings(&v).contains(&"-amd64"));
        // "-amd64" is also a bare word; "-amd" comes from the separator table
        assert!(strings(&v).contains(&"-amd"));
    }

    #[test]
    fn test_plain_name_is_valid() {
        let v = validate("web01", &ReservedWords::default());
        assert!(v.is_valid());
        assert!(v.offenses().is_empty());
        assert!(v.into_result("web01").is_ok());
    }

    #[test]
    fn test_every_offense_is_reported_in_order() {
        let v = validate("ks_mirror--boot_x86.arm", &ReservedWords::default());
        assert_eq!(
            strings(&v),
            vec!["--", "-boot", "ks_mirror-", "_x86", ".arm"]
        );
    }

    #[test]
    fn test_bare_words_precede_arch_tokens() {
        let v = validate("centos-i386", &ReservedWords::default());
        assert_eq!(
            v.offenses(),
            &[
                Offense::BareWord("-i386".to_string()),
                Offense::ArchToken("-i386".to_string()),
            ]
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let v = validate("centos7-X86", &ReservedWords::default());
        assert!(v.is_valid());
    }

    #[test]
    fn test_substring_false_positive_is_kept() {
        let v = validate("my-ostree", &ReservedWords::default());
        assert_eq!(strings(&v), vec!["-os"]);
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let v = validate("", &ReservedWords::default());
        assert_eq!(v.offenses(), &[Offense::EmptyName]);
        assert!(matches!(
            v.into_result(""),
            Err(Error::InvalidName { .. })
        ));
    }

    #[test]
    fn test_custom_reserved_words() {
        let reserved = ReservedWords {
            bare_words: vec!["tmp".to_string()],
            arch: vec!["riscv".to_string()],
            separators: vec!["+".to_string()],
        };
        let v = validate("tmp+riscv-x86_64", &reserved);
        assert_eq!(strings(&v), vec!["tmp", "+riscv"]);
    }
}
