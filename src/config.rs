use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::github::DEFAULT_BASE_URL;
use crate::message::MessageTemplate;
use crate::probe::CommandProbe;
use crate::sender::CommandSender;

// =============================================================================
// Defaults
// =============================================================================

/// Repository watched when nothing else is configured
pub const DEFAULT_REPO: &str = "openclaw/openclaw";

/// Timeout for GitHub API requests in seconds
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Timeout for each local version query in seconds
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Timeout for the notification command in seconds
pub const SEND_TIMEOUT_SECS: u64 = 30;

const APP_DIR: &str = "relcheck";

/// relcheck configuration, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// `owner/name` of the watched GitHub repository
    pub repo: String,
    /// Display name used in reports and messages; defaults to the repo name
    pub project_name: Option<String>,
    pub api_base: String,
    pub http_timeout_secs: u64,
    /// Overrides the default state file location
    pub state_file: Option<PathBuf>,
    pub probe: ProbeConfig,
    pub sender: SenderConfig,
    pub upgrade_commands: Vec<String>,
    pub links: Vec<Link>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: DEFAULT_REPO.to_string(),
            project_name: None,
            api_base: DEFAULT_BASE_URL.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            state_file: None,
            probe: ProbeConfig::default(),
            sender: SenderConfig::default(),
            upgrade_commands: vec![
                "npm update -g openclaw".to_string(),
                "npm install -g openclaw".to_string(),
            ],
            links: vec![
                Link::new("Docs", "https://docs.openclaw.ai"),
                Link::new("Discord", "https://discord.com/invite/clawd"),
                Link::new("Skills", "https://clawhub.com"),
            ],
        }
    }
}

/// How the installed version is queried
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub program: String,
    /// Argument sets tried in order until one reports a version
    pub arg_sets: Vec<Vec<String>>,
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: "openclaw".to_string(),
            arg_sets: vec![vec!["version".to_string()], vec!["--version".to_string()]],
            timeout_secs: PROBE_TIMEOUT_SECS,
        }
    }
}

/// How notifications are delivered
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SenderConfig {
    pub program: String,
    /// Arguments placed before `--target` and `--message`
    pub args: Vec<String>,
    /// Channel address, e.g. `telegram:123456`
    pub target: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            program: "openclaw".to_string(),
            args: vec!["message".to_string(), "send".to_string()],
            target: None,
            timeout_secs: SEND_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

impl Link {
    pub fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default config file when
    /// no path is given. A missing default file means defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        serde_json::from_str(&data).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn project_name(&self) -> String {
        self.project_name.clone().unwrap_or_else(|| {
            self.repo
                .rsplit('/')
                .next()
                .unwrap_or(&self.repo)
                .to_string()
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(state_path)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn message_template(&self) -> MessageTemplate {
        MessageTemplate {
            project: self.project_name(),
            repo: self.repo.clone(),
            upgrade_commands: self.upgrade_commands.clone(),
        }
    }

    pub fn command_probe(&self) -> CommandProbe {
        CommandProbe::new(
            self.probe.program.clone(),
            self.probe.arg_sets.clone(),
            Duration::from_secs(self.probe.timeout_secs),
        )
    }

    pub fn command_sender(&self) -> CommandSender {
        CommandSender::new(
            self.sender.program.clone(),
            self.sender.args.clone(),
            Duration::from_secs(self.sender.timeout_secs),
        )
    }
}

/// Returns the path to the data directory for relcheck.
/// Uses $XDG_DATA_HOME/relcheck if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/relcheck,
/// or ./relcheck if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path of the notification state file.
pub fn state_path() -> PathBuf {
    data_dir().join("state.json")
}

/// Returns the default path of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_DIR)
}
