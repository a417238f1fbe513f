//! Backend abstraction for Cobbler operations.
//!
//! The [`Backend`] trait is the single seam where processes are started,
//! allowing for different implementations (real CLI, in-memory fake for
//! testing).

pub mod cli;
pub mod fake;

use crate::command::CobblerCommand;
use crate::error::Result;
use crate::types::CommandOutput;
use std::sync::Arc;

/// Backend trait for Cobbler operations.
///
/// Implementations run one command at a time and block until it exits.
/// A non-zero exit is reported through [`CommandOutput`], not as an error;
/// `Err` means the command could not be run to completion at all.
pub trait Backend: Send + Sync {
    /// Run `cobbler <args>`.
    fn run(&self, command: &CobblerCommand) -> Result<CommandOutput>;

    /// Run a host program (`mount`, `umount`).
    fn run_host(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn run(&self, command: &CobblerCommand) -> Result<CommandOutput> {
        (**self).run(command)
    }

    fn run_host(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        (**self).run_host(program, args)
    }
}

pub use cli::CliBackend;
pub use fake::FakeCobbler;
