//! Cobbler objects modeled as declarative resources
//!
//! Every object is a [`declarative::Resource`] with:
//! - State detection through `cobbler ... report` / `cobbler profile find`
//! - Apply function (query -> decide -> act -> verify)
//! - A deferred `cobbler sync` queued by every mutation

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod image;
pub mod profile;

pub use image::{Image, ImageSpec};
pub use profile::{Profile, ProfileSpec};

/// Whether an object should exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// A declared Cobbler object
#[derive(Debug, Clone)]
pub enum ObjectSpec {
    Image(ImageSpec),
    Profile(ProfileSpec),
}

impl ObjectSpec {
    /// Same object with `ensure = absent`
    pub fn into_absent(self) -> Self {
        match self {
            Self::Image(spec) => Self::Image(ImageSpec {
                ensure: Ensure::Absent,
                ..spec
            }),
            Self::Profile(spec) => Self::Profile(ProfileSpec {
                ensure: Ensure::Absent,
                ..spec
            }),
        }
    }
}
