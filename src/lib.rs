//! # relcheck
//!
//! Watches one upstream project's GitHub releases, compares the latest tag
//! with the locally installed version, and announces each new release once.
//!
//! **relcheck** is meant to be run by a scheduler such as cron: every
//! invocation performs one check and exits.
//!
//! # Usage
//!
//! ## Command line
//!
//! ```shell
//! # Print an update report for the configured project
//! relcheck check
//!
//! # Send a notification if a new release appeared since the last run
//! relcheck notify --target telegram:123456
//! ```
//!
//! `notify` exits with status 1 when GitHub cannot be reached or the
//! notification command fails, and 0 otherwise, whether or not a message
//! was due.
//!
//! ## Comparing versions
//!
//! Version strings are normalized before comparison, so `v1.2.0-beta` sorts
//! before `1.2.0`. Strings that cannot be parsed fall back to exact equality:
//!
//! ```
//! use relcheck::{Comparison, compare};
//!
//! assert_eq!(compare(Some("1.0.0"), "v1.2.0"), Comparison::LocalOlder);
//! assert_eq!(compare(Some("1.2.0-beta"), "1.2.0"), Comparison::LocalOlder);
//! assert_eq!(compare(Some("garbage"), "garbage"), Comparison::Equal);
//! assert_eq!(compare(Some("garbage"), "v1.0.0"), Comparison::Incomparable);
//! assert_eq!(compare(None, "v1.0.0"), Comparison::UnknownLocal);
//! ```
//!
//! ## Running a notify cycle
//!
//! [`Notifier`] takes its collaborators as trait objects, so any release
//! source, version probe or sender can be plugged in:
//!
//! ```no_run
//! use std::time::Duration;
//! use relcheck::{Config, GitHubClient, Notifier, Outcome, StateStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let github = GitHubClient::new(&config.api_base, Duration::from_secs(10))?;
//!     let probe = config.command_probe();
//!     let sender = config.command_sender();
//!     let store = StateStore::new(config.state_path());
//!     let template = config.message_template();
//!
//!     let notifier = Notifier::new(&github, &probe, &sender, &store, &template, "telegram:123456");
//!     match notifier.run()? {
//!         Outcome::Notified { tag, .. } => println!("announced {tag}"),
//!         Outcome::Skipped { tag, reason, .. } => println!("{tag}: {reason:?}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # State
//!
//! The notifier remembers the last announced tag in a small JSON file:
//!
//! ```text
//! {
//!   "last_notified_version": "v1.1.0",
//!   "last_check": "2026-10-14T09:30:00Z"
//! }
//! ```
//!
//! - **Location**: `$XDG_DATA_HOME/relcheck/state.json` (or `~/.local/share/relcheck/state.json`)
//! - **Missing or corrupt file**: treated as empty
//! - **Writes**: atomic (temporary file + rename)
//!
//! On the very first run against an up-to-date install the current tag is
//! recorded without sending anything.
//!

pub mod config;
pub mod engine;
pub mod error;
pub mod github;
pub mod message;
mod process;
pub mod probe;
pub mod report;
pub mod sender;
pub mod state;
pub mod version;

pub use config::Config;
pub use engine::{Decision, Notifier, Outcome, SkipReason, decide};
pub use error::{CheckError, ConfigError, SendError, SourceError, StateError};
pub use github::{ActivityFeed, GitHubClient, ReleaseInfo, ReleaseSource};
pub use probe::{CommandProbe, VersionProbe};
pub use report::{ConsoleReporter, Report, Reporter, Tone};
pub use sender::{CommandSender, NotificationSender};
pub use state::{NotificationState, StateStore};
pub use version::{Comparison, NormalizedVersion, compare, normalize};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(normalize("2.4.1").unwrap() > normalize("2.4.0").unwrap());
        assert!(normalize("2.4.0").unwrap() > normalize("2.4.0-alpha").unwrap());
        assert!(normalize("1.1.1").unwrap() > normalize("1.1.0").unwrap());
        assert!(normalize("v10.0.0").unwrap() > normalize("v9.9.9").unwrap());
    }

    #[test]
    fn test_prerelease_ordering() {
        assert!(normalize("1.0.0").unwrap() > normalize("1.0.0-rc1").unwrap());
        assert!(normalize("1.0.0-rc2").unwrap() > normalize("1.0.0-rc1").unwrap());
        assert!(normalize("1.0.0-beta").unwrap() < normalize("1.0.0-rc").unwrap());
        assert!(normalize("1.0.0-alpha").unwrap() < normalize("1.0.0-beta").unwrap());
    }

    #[test]
    fn test_compare_is_deterministic() {
        for (local, latest) in [("v1.0.0", "v1.1.0"), ("garbage", "v1.0.0"), ("1.2.0-beta", "1.2.0")] {
            assert_eq!(compare(Some(local), latest), compare(Some(local), latest));
        }
    }
}
