//! The human-readable update report printed by `relcheck check`.
//!
//! Report code never writes to the console itself; everything goes through a
//! [`Reporter`], so the same report can be rendered in color, as plain text,
//! or captured in tests.

use std::io::{self, Write};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use humanly::{HumanDuration, HumanTime};

use crate::config::Config;
use crate::github::{ActivityFeed, ReleaseInfo, ReleaseSource};
use crate::message::truncate_chars;
use crate::probe::VersionProbe;
use crate::version::{Comparison, compare};

const HISTORY_LIMIT: usize = 5;
const NOTES_LINES: usize = 15;
const NOTES_LINE_CHARS: usize = 100;
const RULE_WIDTH: usize = 60;

/// Visual weight of a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Strong,
    Good,
    Warn,
    Error,
    Link,
}

/// Output capability for reports.
pub trait Reporter {
    fn header(&mut self, title: &str) -> io::Result<()>;
    fn section(&mut self, title: &str) -> io::Result<()>;
    fn line(&mut self, tone: Tone, text: &str) -> io::Result<()>;
    fn rule(&mut self) -> io::Result<()>;
}

/// Writes the report to a terminal, colored unless color is disabled globally
/// (see `colored::control`).
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn header(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out)?;
        self.rule()?;
        writeln!(self.out, "{}", title.bold().cyan())?;
        self.rule()
    }

    fn section(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out, "\n{}", format!("▶ {title}").blue())
    }

    fn line(&mut self, tone: Tone, text: &str) -> io::Result<()> {
        let styled = match tone {
            Tone::Plain => text.normal(),
            Tone::Strong => text.bold(),
            Tone::Good => text.green(),
            Tone::Warn => text.yellow(),
            Tone::Error => text.red(),
            Tone::Link => text.cyan(),
        };
        writeln!(self.out, "  {styled}")
    }

    fn rule(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH).magenta())
    }
}

/// Formats a datetime as a human-readable relative time string.
///
/// Returns something like "2 hours ago" or "3 days ago", or `None` if the
/// date is more than 7 days in the past.
fn pretty_age(the_datetime: DateTime<Utc>) -> Option<String> {
    let diff = Utc::now().signed_duration_since(the_datetime);

    if diff.num_days() > 7 {
        return None;
    }

    if diff.num_seconds() < 0 {
        let future_duration = Duration::from_secs(diff.num_seconds().unsigned_abs());
        return Some(format!("in {}", HumanTime::from(future_duration).to_string()));
    }

    let duration = Duration::from_secs(diff.num_seconds().max(0) as u64);
    let past_time = SystemTime::now() - duration;
    Some(HumanDuration::from(Some(past_time)).to_string())
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "unknown date".to_string(),
    }
}

/// Everything the report reads from.
pub struct Report<'a> {
    pub config: &'a Config,
    pub source: &'a dyn ReleaseSource,
    pub feed: &'a dyn ActivityFeed,
    pub probe: &'a dyn VersionProbe,
}

impl Report<'_> {
    /// Renders the full report. Fetch failures become report lines; only
    /// output errors are returned.
    pub fn render(&self, out: &mut dyn Reporter, now: DateTime<Local>) -> io::Result<()> {
        let repo = &self.config.repo;
        let project = self.config.project_name();

        out.header(&format!("🐾 {project} update checker"))?;
        out.line(
            Tone::Plain,
            &format!("Checked at: {}", now.format("%Y-%m-%d %H:%M:%S")),
        )?;

        out.section("Local version")?;
        let local = self.probe.detect_installed();
        match &local {
            Some(v) => out.line(Tone::Good, &format!("Current version: {v}"))?,
            None => out.line(
                Tone::Warn,
                &format!(
                    "Could not detect the local version; is {} installed?",
                    self.config.probe.program
                ),
            )?,
        }

        out.section("Latest release")?;
        let latest = match self.source.fetch_latest(repo) {
            Ok(release) => {
                self.latest_release(out, &release, local.as_deref())?;
                Some(release)
            }
            Err(e) => {
                out.line(Tone::Error, &format!("Fetch failed: {e}"))?;
                None
            }
        };

        self.history(out)?;
        self.commits(out)?;
        self.discussions(out)?;
        self.resources(out)?;
        self.advice(out, local.as_deref(), latest.as_ref())?;

        footer(out)
    }

    fn latest_release(
        &self,
        out: &mut dyn Reporter,
        release: &ReleaseInfo,
        local: Option<&str>,
    ) -> io::Result<()> {
        out.line(Tone::Strong, &format!("Latest version: {}", release.tag))?;
        let age = release
            .published_at
            .and_then(pretty_age)
            .map(|age| format!(" ({age})"))
            .unwrap_or_default();
        out.line(
            Tone::Plain,
            &format!("Published: {}{age}", format_date(release.published_at)),
        )?;

        if local.is_some() {
            let (tone, status) = match compare(local, &release.tag) {
                Comparison::LocalOlder => (Tone::Warn, "⚠️  New version available!"),
                Comparison::Equal => (Tone::Good, "✅ Up to date"),
                Comparison::LocalNewer => (
                    Tone::Link,
                    "ℹ️  Local version is newer than the release (development build?)",
                ),
                Comparison::Incomparable | Comparison::UnknownLocal => {
                    (Tone::Warn, "⚠️  Versions differ, please check manually")
                }
            };
            out.line(tone, &format!("Status: {status}"))?;
        }

        if !release.body.trim().is_empty() {
            out.line(Tone::Strong, "")?;
            out.line(Tone::Strong, "Release notes:")?;
            for line in release.body.lines().take(NOTES_LINES) {
                if !line.trim().is_empty() {
                    out.line(Tone::Plain, &format!("  {}", truncate_chars(line, NOTES_LINE_CHARS)))?;
                }
            }
        }

        if !release.html_url.is_empty() {
            out.line(Tone::Plain, "")?;
            out.line(Tone::Link, &format!("Details: {}", release.html_url))?;
        }
        Ok(())
    }

    fn history(&self, out: &mut dyn Reporter) -> io::Result<()> {
        out.section("Release history")?;
        match self.feed.recent_releases(&self.config.repo, HISTORY_LIMIT) {
            Ok(releases) => {
                for r in releases {
                    let name = truncate_chars(r.name.as_deref().unwrap_or(""), 50);
                    out.line(
                        Tone::Plain,
                        &format!("• {} ({}) - {name}", r.tag, format_date(r.published_at)),
                    )?;
                }
                Ok(())
            }
            Err(_) => out.line(Tone::Error, "Fetch failed"),
        }
    }

    fn commits(&self, out: &mut dyn Reporter) -> io::Result<()> {
        out.section("Recent commits")?;
        match self.feed.recent_commits(&self.config.repo, HISTORY_LIMIT) {
            Ok(commits) => {
                for c in commits {
                    let sha = c.sha.get(..7).unwrap_or(&c.sha);
                    let subject = truncate_chars(c.message.lines().next().unwrap_or(""), 60);
                    out.line(Tone::Plain, &format!("• {sha} {subject} - {}", c.author))?;
                }
                Ok(())
            }
            Err(_) => out.line(Tone::Error, "Fetch failed"),
        }
    }

    fn discussions(&self, out: &mut dyn Reporter) -> io::Result<()> {
        out.section("Community discussions")?;
        let found = self
            .feed
            .discussions(&self.config.repo, HISTORY_LIMIT)
            .unwrap_or_default();
        if found.is_empty() {
            return out.line(
                Tone::Plain,
                &format!(
                    "No discussions available, see https://github.com/{}/discussions",
                    self.config.repo
                ),
            );
        }
        for d in found {
            out.line(Tone::Plain, &format!("• {}", truncate_chars(&d.title, 70)))?;
            out.line(Tone::Link, &format!("  {} ({} replies)", d.html_url, d.comments))?;
        }
        Ok(())
    }

    fn resources(&self, out: &mut dyn Reporter) -> io::Result<()> {
        out.section("Community resources")?;
        for link in &self.config.links {
            out.line(Tone::Link, &format!("{:<10} {}", format!("{}:", link.label), link.url))?;
        }
        out.line(
            Tone::Link,
            &format!("{:<10} https://github.com/{}", "GitHub:", self.config.repo),
        )
    }

    fn advice(
        &self,
        out: &mut dyn Reporter,
        local: Option<&str>,
        latest: Option<&ReleaseInfo>,
    ) -> io::Result<()> {
        out.section("Upgrade advice")?;
        let releases_page = format!(
            "See https://github.com/{}/releases for upgrade instructions",
            self.config.repo
        );

        let comparison = match (local, latest) {
            (Some(_), Some(release)) => compare(local, &release.tag),
            _ => return out.line(Tone::Plain, &releases_page),
        };

        match comparison {
            Comparison::LocalOlder => {
                out.line(Tone::Warn, "New version detected! Upgrade with:")?;
                for (i, cmd) in self.config.upgrade_commands.iter().enumerate() {
                    if i > 0 {
                        out.line(Tone::Plain, "or:")?;
                    }
                    out.line(Tone::Good, &format!("  {cmd}"))?;
                }
                Ok(())
            }
            Comparison::Equal | Comparison::LocalNewer => {
                out.line(Tone::Good, "Already up to date, nothing to upgrade.")
            }
            Comparison::Incomparable | Comparison::UnknownLocal => {
                out.line(Tone::Plain, &releases_page)
            }
        }
    }
}

fn footer(out: &mut dyn Reporter) -> io::Result<()> {
    out.line(Tone::Plain, "")?;
    out.rule()
}
