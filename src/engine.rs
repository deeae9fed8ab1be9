//! The check-and-notify cycle.
//!
//! [`decide`] is the pure rule; [`Notifier`] wires it to the release source,
//! the local probe, the sender and the state store for one run.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::CheckError;
use crate::github::{ReleaseInfo, ReleaseSource};
use crate::message::MessageTemplate;
use crate::probe::VersionProbe;
use crate::sender::NotificationSender;
use crate::state::{NotificationState, StateStore};
use crate::version::{Comparison, compare};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The install already runs the latest release.
    UpToDate,
    /// The install is ahead of the latest release. Informational only.
    LocalNewer,
    /// This tag was announced before.
    AlreadyNotified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Notify,
    Skip(SkipReason),
}

/// Decides whether `tag` should be announced.
///
/// A tag is announced when the comparison says it may be new for this install
/// and the state has not recorded it yet, so each tag fires at most once.
pub fn decide(comparison: Comparison, tag: &str, state: &NotificationState) -> Decision {
    if !comparison.indicates_update() {
        return Decision::Skip(match comparison {
            Comparison::LocalNewer => SkipReason::LocalNewer,
            _ => SkipReason::UpToDate,
        });
    }
    if state.already_notified(tag) {
        return Decision::Skip(SkipReason::AlreadyNotified);
    }
    Decision::Notify
}

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Notified {
        tag: String,
        local: Option<String>,
    },
    Skipped {
        tag: String,
        local: Option<String>,
        reason: SkipReason,
    },
}

impl Outcome {
    pub fn tag(&self) -> &str {
        match self {
            Outcome::Notified { tag, .. } | Outcome::Skipped { tag, .. } => tag,
        }
    }
}

/// One notify cycle over injected collaborators.
pub struct Notifier<'a> {
    source: &'a dyn ReleaseSource,
    probe: &'a dyn VersionProbe,
    sender: &'a dyn NotificationSender,
    store: &'a StateStore,
    template: &'a MessageTemplate,
    target: &'a str,
}

impl<'a> Notifier<'a> {
    pub fn new(
        source: &'a dyn ReleaseSource,
        probe: &'a dyn VersionProbe,
        sender: &'a dyn NotificationSender,
        store: &'a StateStore,
        template: &'a MessageTemplate,
        target: &'a str,
    ) -> Self {
        Self {
            source,
            probe,
            sender,
            store,
            template,
            target,
        }
    }

    pub fn run(&self) -> Result<Outcome, CheckError> {
        self.run_at(Utc::now())
    }

    /// Runs one cycle, stamping the state with `now`.
    ///
    /// The state file is left untouched when the release source fails or the
    /// notification cannot be delivered, so the next run retries.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<Outcome, CheckError> {
        info!(repo = %self.template.repo, "checking for updates");

        let mut state = self.store.load();
        let local = self.probe.detect_installed();
        if local.is_none() {
            info!("local version unknown");
        }

        let release = self.source.fetch_latest(&self.template.repo).map_err(|e| {
            warn!(error = %e, "failed to fetch latest release");
            CheckError::from(e)
        })?;

        let comparison = compare(local.as_deref(), &release.tag);
        let decision = decide(comparison, &release.tag, &state);
        info!(
            local = local.as_deref().unwrap_or("unknown"),
            latest = %release.tag,
            ?comparison,
            ?decision,
            "compared versions"
        );

        match decision {
            Decision::Notify => self.notify(&mut state, release, local, now),
            Decision::Skip(reason) => {
                state.record_check(&release.tag, now);
                self.store.save(&state)?;
                info!(tag = %release.tag, ?reason, "no notification needed");
                Ok(Outcome::Skipped {
                    tag: release.tag,
                    local,
                    reason,
                })
            }
        }
    }

    fn notify(
        &self,
        state: &mut NotificationState,
        release: ReleaseInfo,
        local: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, CheckError> {
        let message = self.template.render(&release, local.as_deref());
        info!(tag = %release.tag, channel = self.target, "new version detected, sending notification");

        if let Err(e) = self.sender.send(&message, self.target) {
            warn!(tag = %release.tag, error = %e, "notification failed, state left unchanged");
            return Err(e.into());
        }

        state.record_notified(&release.tag, now);
        self.store.save(state)?;
        info!(tag = %release.tag, "notification sent");
        Ok(Outcome::Notified {
            tag: release.tag,
            local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SendError, SourceError};
    use chrono::TimeZone;
    use rstest::rstest;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::TempDir;

    struct FixedSource(Option<&'static str>);

    impl ReleaseSource for FixedSource {
        fn fetch_latest(&self, _repo: &str) -> Result<ReleaseInfo, SourceError> {
            match self.0 {
                Some(tag) => Ok(ReleaseInfo {
                    tag: tag.to_string(),
                    name: None,
                    published_at: None,
                    body: "Release notes".to_string(),
                    html_url: String::new(),
                }),
                None => Err(SourceError::InvalidResponse("offline".to_string())),
            }
        }
    }

    struct FixedProbe(Option<&'static str>);

    impl VersionProbe for FixedProbe {
        fn detect_installed(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        fail: Cell<bool>,
        sent: RefCell<Vec<(String, String)>>,
    }

    impl NotificationSender for RecordingSender {
        fn send(&self, message: &str, target: &str) -> Result<(), SendError> {
            self.sent
                .borrow_mut()
                .push((message.to_string(), target.to_string()));
            if self.fail.get() {
                Err(SendError::Failed {
                    program: "fake".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: StateStore,
        template: MessageTemplate,
        sender: RecordingSender,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = StateStore::new(dir.path().join("state.json"));
            Self {
                _dir: dir,
                store,
                template: MessageTemplate {
                    project: "OpenClaw".to_string(),
                    repo: "openclaw/openclaw".to_string(),
                    upgrade_commands: vec!["npm update -g openclaw".to_string()],
                },
                sender: RecordingSender::default(),
            }
        }

        fn with_state(self, last_notified: Option<&str>) -> Self {
            self.store
                .save(&NotificationState {
                    last_notified_version: last_notified.map(str::to_string),
                    last_check: None,
                })
                .unwrap();
            self
        }

        fn run(&self, local: Option<&'static str>, latest: Option<&'static str>) -> Result<Outcome, CheckError> {
            let source = FixedSource(latest);
            let probe = FixedProbe(local);
            Notifier::new(
                &source,
                &probe,
                &self.sender,
                &self.store,
                &self.template,
                "telegram:1",
            )
            .run_at(now())
        }

        fn sends(&self) -> usize {
            self.sender.sent.borrow().len()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap()
    }

    fn state_with(last: Option<&str>) -> NotificationState {
        NotificationState {
            last_notified_version: last.map(str::to_string),
            last_check: None,
        }
    }

    #[rstest]
    #[case(Comparison::LocalOlder, None, Decision::Notify)]
    #[case(Comparison::UnknownLocal, None, Decision::Notify)]
    #[case(Comparison::Incomparable, Some("v1.0.0"), Decision::Notify)]
    #[case(Comparison::LocalOlder, Some("v2.0.0"), Decision::Skip(SkipReason::AlreadyNotified))]
    #[case(Comparison::UnknownLocal, Some("v2.0.0"), Decision::Skip(SkipReason::AlreadyNotified))]
    #[case(Comparison::Equal, None, Decision::Skip(SkipReason::UpToDate))]
    #[case(Comparison::LocalNewer, None, Decision::Skip(SkipReason::LocalNewer))]
    fn decide_cases(
        #[case] comparison: Comparison,
        #[case] last: Option<&str>,
        #[case] expected: Decision,
    ) {
        assert_eq!(decide(comparison, "v2.0.0", &state_with(last)), expected);
    }

    #[test]
    fn new_release_is_announced_once_and_recorded() {
        let fx = Fixture::new();

        let outcome = fx.run(Some("v1.0.0"), Some("v1.1.0")).unwrap();

        assert_eq!(
            outcome,
            Outcome::Notified {
                tag: "v1.1.0".to_string(),
                local: Some("v1.0.0".to_string()),
            }
        );
        let sent = fx.sender.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("v1.1.0"));
        assert_eq!(sent[0].1, "telegram:1");
        assert_eq!(
            fx.store.load(),
            NotificationState {
                last_notified_version: Some("v1.1.0".to_string()),
                last_check: Some(now()),
            }
        );
    }

    #[rstest]
    #[case(Some("v1.0.0"))]
    #[case(Some("garbage"))]
    #[case(Some("v2.0.0"))]
    #[case(Some("v3.0.0"))]
    #[case(None)]
    fn already_notified_tag_is_never_sent_again(#[case] local: Option<&'static str>) {
        let fx = Fixture::new().with_state(Some("v2.0.0"));

        let outcome = fx.run(local, Some("v2.0.0")).unwrap();

        assert!(matches!(outcome, Outcome::Skipped { .. }));
        assert_eq!(fx.sends(), 0);
        assert_eq!(fx.store.load().last_notified_version.as_deref(), Some("v2.0.0"));
    }

    #[test]
    fn first_run_on_current_install_bootstraps_state_silently() {
        let fx = Fixture::new();

        let outcome = fx.run(Some("v1.4.0"), Some("v1.4.0")).unwrap();

        assert_eq!(
            outcome,
            Outcome::Skipped {
                tag: "v1.4.0".to_string(),
                local: Some("v1.4.0".to_string()),
                reason: SkipReason::UpToDate,
            }
        );
        assert_eq!(fx.sends(), 0);
        let state = fx.store.load();
        assert_eq!(state.last_notified_version.as_deref(), Some("v1.4.0"));
        assert_eq!(state.last_check, Some(now()));
    }

    #[test]
    fn failed_send_leaves_state_and_retries_next_run() {
        let fx = Fixture::new().with_state(Some("v1.0.0"));
        let before = fs::read(fx.store.path()).unwrap();
        fx.sender.fail.set(true);

        let err = fx.run(Some("v1.0.0"), Some("v1.1.0")).unwrap_err();

        assert!(matches!(err, CheckError::SendFailure(_)));
        assert_eq!(fs::read(fx.store.path()).unwrap(), before);

        fx.sender.fail.set(false);
        let outcome = fx.run(Some("v1.0.0"), Some("v1.1.0")).unwrap();

        assert!(matches!(outcome, Outcome::Notified { .. }));
        assert_eq!(fx.sends(), 2);
        assert_eq!(fx.store.load().last_notified_version.as_deref(), Some("v1.1.0"));
    }

    #[test]
    fn unavailable_source_does_not_touch_state() {
        let fx = Fixture::new().with_state(Some("v1.0.0"));
        let before = fs::read(fx.store.path()).unwrap();

        let err = fx.run(Some("v1.0.0"), None).unwrap_err();

        assert!(matches!(err, CheckError::SourceUnavailable(_)));
        assert_eq!(fs::read(fx.store.path()).unwrap(), before);
        assert_eq!(fx.sends(), 0);
    }

    #[test]
    fn unavailable_source_on_first_run_creates_no_state_file() {
        let fx = Fixture::new();
        assert!(fx.run(None, None).is_err());
        assert!(!fx.store.path().exists());
    }

    #[test]
    fn development_build_is_informational_only() {
        let fx = Fixture::new().with_state(Some("v1.0.0"));

        let outcome = fx.run(Some("v2.0.0-dev"), Some("v1.1.0")).unwrap();

        assert!(matches!(
            outcome,
            Outcome::Skipped {
                reason: SkipReason::LocalNewer,
                ..
            }
        ));
        assert_eq!(fx.sends(), 0);
        assert_eq!(fx.store.load().last_notified_version.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn unknown_local_version_announces_new_tag() {
        let fx = Fixture::new().with_state(Some("v1.0.0"));

        let outcome = fx.run(None, Some("v1.1.0")).unwrap();

        assert!(matches!(outcome, Outcome::Notified { .. }));
        assert!(fx.sender.sent.borrow()[0].0.starts_with("📢"));
    }

    #[test]
    fn unparseable_but_identical_versions_are_up_to_date() {
        let fx = Fixture::new();

        let outcome = fx.run(Some("nightly"), Some("nightly")).unwrap();

        assert!(matches!(
            outcome,
            Outcome::Skipped {
                reason: SkipReason::UpToDate,
                ..
            }
        ));
        assert_eq!(fx.sends(), 0);
    }

    #[rstest]
    #[case(Some("v1.1.0"))]
    #[case(Some("v1.0.0"))]
    fn unwritable_state_file_fails_the_run(#[case] latest: Option<&'static str>) {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let fx = Fixture {
            store: StateStore::new(blocker.join("state.json")),
            ..Fixture::new()
        };

        let err = fx.run(Some("v1.0.0"), latest).unwrap_err();

        assert!(matches!(err, CheckError::State(_)));
    }

    #[test]
    fn corrupt_state_is_treated_as_empty() {
        let fx = Fixture::new();
        fs::write(fx.store.path(), "]]]").unwrap();

        let outcome = fx.run(Some("v1.0.0"), Some("v1.1.0")).unwrap();

        assert!(matches!(outcome, Outcome::Notified { .. }));
        assert_eq!(fx.store.load().last_notified_version.as_deref(), Some("v1.1.0"));
    }
}
