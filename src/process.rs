//! Running external commands with a hard timeout.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a command that exited on its own.
#[derive(Debug)]
pub struct Finished {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug)]
pub enum RunError {
    Spawn(io::Error),
    /// The command was killed after the timeout elapsed.
    TimedOut,
}

/// Runs `program` with `args`, killing it if it outlives `timeout`.
///
/// The deadline also covers reading the output. A background process that
/// inherited the pipes would otherwise keep them open after `program` exits.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<Finished, RunError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(RunError::Spawn)?;

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            debug!(program, ?timeout, "killing command after timeout");
            let _ = child.kill();
            let _ = child.wait();
            return Err(RunError::TimedOut);
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RunError::Spawn(e));
        }
    };

    Ok(Finished {
        status,
        stdout: collect(program, stdout, deadline)?,
        stderr: collect(program, stderr, deadline)?,
    })
}

fn collect(
    program: &str,
    pipe: Option<Receiver<String>>,
    deadline: Instant,
) -> Result<String, RunError> {
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };
    match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Ok(output),
        Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
        Err(RecvTimeoutError::Timeout) => {
            debug!(program, "output still open after the command exited");
            Err(RunError::TimedOut)
        }
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn captures_output_and_status() {
        let done = run_with_timeout("sh", &sh("echo out; echo err >&2; exit 3"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(done.status.code(), Some(3));
        assert_eq!(done.stdout.trim(), "out");
        assert_eq!(done.stderr.trim(), "err");
    }

    #[test]
    fn kills_commands_that_outlive_the_timeout() {
        let started = Instant::now();
        let result = run_with_timeout("sh", &sh("sleep 5"), Duration::from_millis(100));
        assert!(matches!(result, Err(RunError::TimedOut)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn background_child_holding_the_pipe_does_not_extend_the_timeout() {
        let started = Instant::now();
        let result = run_with_timeout(
            "sh",
            &sh("sleep 4 & echo v1.0.0"),
            Duration::from_millis(500),
        );
        assert!(matches!(result, Err(RunError::TimedOut)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let result = run_with_timeout("relcheck-no-such-program", &[], Duration::from_secs(1));
        assert!(matches!(result, Err(RunError::Spawn(_))));
    }
}
