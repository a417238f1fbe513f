//! Boot artifacts and installation media: fetching, checksums, and the
//! decision of whether an installed artifact must be replaced.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Upper bound for a single download (installation ISOs included).
const MAX_DOWNLOAD_SIZE: u64 = 16 * 1024 * 1024 * 1024;

const USER_AGENT: &str = concat!("cobblerd/", env!("CARGO_PKG_VERSION"));

/// Compute the lowercase hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Why an artifact has to be (re)installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    /// The distro was just imported
    NewDistro,
    /// The artifact is not installed at the managed path
    Missing,
    /// No checksum configured, so the installed copy cannot be trusted
    NoChecksum,
    /// Installed copy hashes differently from the configured checksum
    ChecksumChanged,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewDistro => write!(f, "new distro"),
            Self::Missing => write!(f, "not installed"),
            Self::NoChecksum => write!(f, "no checksum configured"),
            Self::ChecksumChanged => write!(f, "checksum changed"),
        }
    }
}

/// Decide whether an artifact has to be fetched and registered again.
///
/// `installed` is the managed path when the distro currently references it,
/// `None` otherwise. Checks apply in order: `force`, presence, checksum
/// configured, checksum match. Returns `None` when nothing needs doing.
pub fn needs_update(
    installed: Option<&Path>,
    checksum: Option<&str>,
    force: bool,
) -> Result<Option<UpdateReason>> {
    if force {
        return Ok(Some(UpdateReason::NewDistro));
    }
    let Some(path) = installed.filter(|p| p.is_file()) else {
        return Ok(Some(UpdateReason::Missing));
    };
    let Some(expected) = checksum else {
        return Ok(Some(UpdateReason::NoChecksum));
    };
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        log::debug!("{} matches configured checksum", path.display());
        Ok(None)
    } else {
        log::debug!(
            "{} hashes to {actual}, expected {expected}",
            path.display()
        );
        Ok(Some(UpdateReason::ChecksumChanged))
    }
}

/// Whether a source string refers to a remote resource.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Final path component of a source, used to name installed artifacts.
pub fn basename(source: &str) -> Option<&str> {
    let trimmed = source.split(['?', '#']).next().unwrap_or(source);
    trimmed
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Copy or download `source` to `dest`, verifying the SHA-256 when given.
///
/// Parent directories of `dest` are created. Content is written next to
/// `dest` and renamed into place only after the checksum matched, so a failed
/// fetch never leaves a partial artifact at `dest`.
pub fn fetch(source: &str, dest: &Path, checksum: Option<&str>) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(dest);

    log::info!("Fetching {source} -> {}", dest.display());
    let written = if is_remote(source) {
        download(source, &partial)
    } else {
        let from = Path::new(source.strip_prefix("file://").unwrap_or(source));
        fs::copy(from, &partial).map_err(Error::from)
    };
    let written = match written {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
    };
    log::debug!("Fetched {written} bytes from {source}");

    if let Some(expected) = checksum {
        let actual = sha256_file(&partial)?;
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            let _ = fs::remove_file(&partial);
            return Err(Error::ChecksumMismatch {
                path: dest.to_path_buf(),
                expected: expected.trim().to_string(),
                actual,
            });
        }
    }

    fs::rename(&partial, dest)?;
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn download(url: &str, dest: &Path) -> Result<u64> {
    let agent = ureq::Agent::new_with_defaults();
    let mut response = agent
        .get(url)
        .header("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| Error::Download {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let mut reader = response
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD_SIZE)
        .reader();
    let mut file = File::create(dest)?;
    let written = io::copy(&mut reader, &mut file).map_err(|e| Error::Download {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    file.flush()?;
    Ok(written)
}
