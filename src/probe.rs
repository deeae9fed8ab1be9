//! Detecting the locally installed version.

use std::time::Duration;

use tracing::debug;

use crate::process::{RunError, run_with_timeout};

/// Supplies the installed version, or `None` when it cannot be determined.
pub trait VersionProbe {
    fn detect_installed(&self) -> Option<String>;
}

/// Asks a local binary for its version.
///
/// Each argument set is tried in order (`openclaw version`, then
/// `openclaw --version`); the first zero exit with non-empty output wins.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    arg_sets: Vec<Vec<String>>,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>, arg_sets: Vec<Vec<String>>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            arg_sets,
            timeout,
        }
    }

    fn try_args(&self, args: &[String]) -> Option<String> {
        match run_with_timeout(&self.program, args, self.timeout) {
            Ok(done) if done.status.success() => {
                let version = done.stdout.trim();
                (!version.is_empty()).then(|| version.to_string())
            }
            Ok(done) => {
                debug!(program = %self.program, ?args, status = %done.status, "version query failed");
                None
            }
            Err(RunError::TimedOut) => {
                debug!(program = %self.program, ?args, "version query timed out");
                None
            }
            Err(RunError::Spawn(e)) => {
                debug!(program = %self.program, error = %e, "version query could not start");
                None
            }
        }
    }
}

impl VersionProbe for CommandProbe {
    fn detect_installed(&self) -> Option<String> {
        self.arg_sets.iter().find_map(|args| self.try_args(args))
    }
}
