//! Real Cobbler CLI backend using `cobbler` commands.

use crate::backend::Backend;
use crate::command::CobblerCommand;
use crate::error::{Error, Result};
use crate::types::CommandOutput;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Backend that executes real `cobbler` commands.
pub struct CliBackend {
    /// Path to the cobbler executable
    cobbler_path: PathBuf,
    /// Upper bound for a single invocation
    timeout: Duration,
}

impl CliBackend {
    /// Create a backend for the given executable and per-command timeout.
    pub fn new(cobbler_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            cobbler_path: cobbler_path.into(),
            timeout,
        }
    }

    /// Spawn a program and wait for it, killing it once the timeout elapses.
    fn exec(&self, program: &str, args: &[String], display: &str) -> Result<CommandOutput> {
        log::debug!("Running: {display}");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: display.to_string(),
                source,
            })?;

        // Pipes are drained concurrently; a full pipe would stall the child
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_with_timeout(&mut child, self.timeout)? {
            Some(status) => status,
            None => {
                reap(&mut child);
                return Err(Error::Timeout {
                    command: display.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let output = CommandOutput {
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            exit_code: status.code(),
        };
        log::trace!(
            "Exit {:?} from {display}; stdout={:?} stderr={:?}",
            output.exit_code,
            output.stdout,
            output.stderr
        );
        Ok(output)
    }
}

impl Backend for CliBackend {
    fn run(&self, command: &CobblerCommand) -> Result<CommandOutput> {
        let program = self.cobbler_path.to_string_lossy();
        self.exec(&program, command.args(), &command.to_string())
    }

    fn run_host(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let display = format!("{program} {}", args.join(" "));
        self.exec(program, &args, &display)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).to_string()
    })
}

/// Kill a child that is still running and wait for it to exit
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                reap(child);
                return Err(e.into());
            }
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
