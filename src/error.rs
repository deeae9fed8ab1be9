use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The release source could not supply the latest release.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Repository or release not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The notification command did not deliver the message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to write state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no notification target configured (use --target or sender.target)")]
    MissingTarget,
}

/// Failure of one notify cycle. Each variant maps to a non-zero exit.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("release source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("notification failed: {0}")]
    SendFailure(#[from] SendError),

    #[error(transparent)]
    State(#[from] StateError),
}
