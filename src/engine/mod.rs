//! Execution engine for cobblerd
//!
//! The engine orchestrates:
//! 1. Diffing - Compute current vs desired state
//! 2. Confirming - Show the diff and ask before changing anything
//! 3. Executing - Apply objects in order, then sync once

pub mod differ;
pub mod executor;

pub use executor::{ApplyOptions, execute};
