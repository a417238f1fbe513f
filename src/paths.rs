//! Centralized path resolution for cobblerd
//!
//! # Environment Variables
//!
//! - `COBBLERD_CONFIG` - Override the config file path
//!
//! # Config File Resolution Priority
//!
//! 1. `--config <PATH>` on the command line
//! 2. `COBBLERD_CONFIG` environment variable
//! 3. `XDG_CONFIG_HOME/cobblerd/config.toml` (if set)
//! 4. `~/.config/cobblerd/config.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config file override
pub const ENV_CONFIG: &str = "COBBLERD_CONFIG";

/// File name of the configuration inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the config file path
///
/// The file does not have to exist.
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    // 1. Command line
    if let Some(path) = explicit {
        let path = expand(&path.to_string_lossy());
        log::debug!("Using config file from --config: {}", path.display());
        return Ok(path);
    }

    // 2. Environment variable override
    if let Ok(file) = std::env::var(ENV_CONFIG) {
        let path = expand(&file);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(path);
    }

    // 3. XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("cobblerd").join(CONFIG_FILE);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 4. ~/.config/cobblerd/config.toml
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("cobblerd").join(CONFIG_FILE);
    log::debug!("Using default config file: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
