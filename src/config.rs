//! Configuration file for cobblerd
//!
//! ```toml
//! [cobbler]
//! bin = "/usr/bin/cobbler"
//! timeout_secs = 600
//!
//! [paths]
//! file_cache = "/var/cache/cobblerd"
//!
//! [[image]]
//! name = "centos7"
//! source = "http://mirror.example.com/CentOS-7-x86_64-Minimal.iso"
//! os_breed = "redhat"
//!
//! [[profile]]
//! name = "web"
//! distro = "centos7-x86_64"
//! ```

use anyhow::{Context, Result, bail};
use cobblerkit::ReservedWords;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::resource::{Ensure, ImageSpec, ProfileSpec};

/// Default per-invocation timeout for the cobbler executable
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Root of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cobbler: CobblerSettings,
    pub paths: PathSettings,
    pub reserved_words: ReservedWords,
    #[serde(rename = "image", skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageSpec>,
    #[serde(rename = "profile", skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileSpec>,
}

/// How the cobbler executable is invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CobblerSettings {
    pub bin: PathBuf,
    pub timeout_secs: u64,
}

impl Default for CobblerSettings {
    fn default() -> Self {
        Self {
            bin: PathBuf::from("cobbler"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Directories on the Cobbler server, as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Downloaded ISOs and the loop mount point
    pub file_cache: String,
    /// Installed kickstart/preseed files
    pub kickstart_dir: String,
    /// Per-distro kernel and initrd copies
    pub tftp_images_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            file_cache: "/var/cache/cobblerd".to_string(),
            kickstart_dir: "/var/lib/cobbler/kickstarts".to_string(),
            tftp_images_dir: "/var/lib/tftpboot/grub/images".to_string(),
        }
    }
}

impl PathSettings {
    /// Expand `~` and environment variables in every directory
    pub fn resolve(&self) -> Paths {
        Paths {
            file_cache: paths::expand(&self.file_cache),
            kickstart_dir: paths::expand(&self.kickstart_dir),
            tftp_images_dir: paths::expand(&self.tftp_images_dir),
        }
    }
}

/// Resolved server directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub file_cache: PathBuf,
    pub kickstart_dir: PathBuf,
    pub tftp_images_dir: PathBuf,
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist
    ///
    /// Returns the config together with the path it was resolved from.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = paths::config_file(explicit)?;
        if !path.exists() {
            log::info!("No config file at {}, using defaults", path.display());
            return Ok((Self::default(), path));
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!(
            "Loaded {} images and {} profiles from {}",
            config.images.len(),
            config.profiles.len(),
            path.display()
        );
        Ok((config, path))
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Check constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.cobbler.timeout_secs == 0 {
            bail!("cobbler.timeout_secs must be greater than zero");
        }

        let mut distros = BTreeSet::new();
        for image in &self.images {
            if !distros.insert(image.distro()) {
                bail!("image {} is declared more than once", image.distro());
            }
            if image.ensure == Ensure::Present {
                if image.source.is_none() {
                    bail!("image {}: `source` is required", image.name);
                }
                if image.os_breed.is_none() {
                    bail!("image {}: `os_breed` is required", image.name);
                }
            }
        }

        let mut profiles = BTreeSet::new();
        for profile in &self.profiles {
            if !profiles.insert(profile.name.as_str()) {
                bail!("profile {} is declared more than once", profile.name);
            }
        }

        Ok(())
    }
}
