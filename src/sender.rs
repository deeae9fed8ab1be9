//! Delivering notifications through an external command.

use std::time::Duration;

use tracing::debug;

use crate::error::SendError;
use crate::process::{RunError, run_with_timeout};

/// Delivers a message to a channel address such as `telegram:12345`.
pub trait NotificationSender {
    fn send(&self, message: &str, target: &str) -> Result<(), SendError>;
}

/// Runs `{program} {args..} --target {target} --message {message}`.
#[derive(Debug, Clone)]
pub struct CommandSender {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSender {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    fn command_args(&self, message: &str, target: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--target".to_string(),
            target.to_string(),
            "--message".to_string(),
            message.to_string(),
        ]);
        args
    }
}

impl NotificationSender for CommandSender {
    fn send(&self, message: &str, target: &str) -> Result<(), SendError> {
        let args = self.command_args(message, target);
        debug!(program = %self.program, channel = target, "sending notification");

        let done = run_with_timeout(&self.program, &args, self.timeout).map_err(|e| match e {
            RunError::Spawn(source) => SendError::Spawn {
                program: self.program.clone(),
                source,
            },
            RunError::TimedOut => SendError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            },
        })?;

        if done.status.success() {
            Ok(())
        } else {
            Err(SendError::Failed {
                program: self.program.clone(),
                status: done.status.to_string(),
                stderr: done.stderr.trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_and_message_follow_configured_args() {
        let sender = CommandSender::new(
            "openclaw",
            vec!["message".into(), "send".into()],
            Duration::from_secs(30),
        );
        assert_eq!(
            sender.command_args("hello", "telegram:42"),
            vec!["message", "send", "--target", "telegram:42", "--message", "hello"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        // `sh -c 'exit 0' --target .. --message ..` binds the extras to $0, $1...
        let sender = CommandSender::new(
            "sh",
            vec!["-c".into(), "exit 0".into()],
            Duration::from_secs(5),
        );
        assert!(sender.send("hi", "telegram:1").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_stderr() {
        let sender = CommandSender::new(
            "sh",
            vec!["-c".into(), "echo 'chat not found' >&2; exit 4".into()],
            Duration::from_secs(5),
        );
        match sender.send("hi", "telegram:1") {
            Err(SendError::Failed { stderr, .. }) => assert_eq!(stderr, "chat not found"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn slow_sender_times_out() {
        let sender = CommandSender::new(
            "sh",
            vec!["-c".into(), "sleep 5".into()],
            Duration::from_millis(100),
        );
        assert!(matches!(
            sender.send("hi", "telegram:1"),
            Err(SendError::Timeout { .. })
        ));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let sender = CommandSender::new("relcheck-no-such-program", vec![], Duration::from_secs(1));
        assert!(matches!(
            sender.send("hi", "telegram:1"),
            Err(SendError::Spawn { .. })
        ));
    }
}
