//! Version normalization and comparison.
//!
//! Release tags and `--version` output are loosely formatted (`v1.2.0`,
//! `1.2.0-beta`, `2026.1.29-1`). [`normalize`] turns them into a
//! [`NormalizedVersion`] that orders the way release numbers usually do, and
//! [`compare`] decides how a locally installed version relates to the latest
//! published tag.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Dotted release, then optional pre, post, dev and `+local` segments.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<release>\d+(?:\.\d+)*)",
        r"(?:[._]?(?P<pre>alpha|beta|preview|pre|rc|a|b|c)[._]?(?P<pre_n>\d+)?)?",
        r"(?:[._]?(?P<post>post|rev|r)[._]?(?P<post_n>\d+)?)?",
        r"(?:[._]?(?P<dev>dev)[._]?(?P<dev_n>\d+)?)?",
        r"(?:\+(?P<local>[a-z0-9]+(?:[._][a-z0-9]+)*))?$",
    ))
    .expect("version pattern is valid")
});

/// Why a version string could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty version string")]
    Empty,

    #[error("unrecognised version string: {0:?}")]
    Invalid(String),
}

/// Pre-release marker. Variant order is release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha(u64),
    Beta(u64),
    Candidate(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    /// `X.devN` with no pre or post segment sorts before every pre-release of `X`.
    DevOnly,
    Pre(PreRelease),
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Dev {
    Dev(u64),
    Release,
}

/// One `.`/`_` separated piece of a `+local` label. Numeric pieces compare
/// as numbers and sort above alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalSegment {
    Text(String),
    Number(u64),
}

/// A parsed, comparable version.
///
/// Equality and ordering ignore insignificant trailing zeros, so `1.0` and
/// `1.0.0` are equal.
#[derive(Debug, Clone)]
pub struct NormalizedVersion {
    text: String,
    release: Vec<u64>,
    pre: Option<PreRelease>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<Vec<LocalSegment>>,
}

impl NormalizedVersion {
    /// The canonical text this version was parsed from (prefix stripped,
    /// hyphens replaced, lowercased).
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn pre_release(&self) -> Option<PreRelease> {
        self.pre
    }

    /// Whether this is a pre-release or development build.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    fn significant_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |i| i + 1);
        &self.release[..len]
    }

    fn sort_key(&self) -> (&[u64], Phase, Option<u64>, Dev, Option<&[LocalSegment]>) {
        let phase = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => Phase::DevOnly,
            (Some(pre), _, _) => Phase::Pre(pre),
            _ => Phase::Final,
        };
        let dev = self.dev.map_or(Dev::Release, Dev::Dev);
        (
            self.significant_release(),
            phase,
            self.post,
            dev,
            self.local.as_deref(),
        )
    }
}

impl PartialEq for NormalizedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for NormalizedVersion {}

impl PartialOrd for NormalizedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NormalizedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for NormalizedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Normalizes a raw version string.
///
/// One leading `v` is stripped and hyphens become dots, so pre-release
/// suffixes take part in ordering (`1.2.0-beta` becomes `1.2.0.beta`).
///
/// # Examples
///
/// ```
/// use relcheck::version::normalize;
///
/// let beta = normalize("v1.2.0-beta").unwrap();
/// let release = normalize("1.2.0").unwrap();
/// assert_eq!(beta.as_str(), "1.2.0.beta");
/// assert!(beta < release);
/// assert!(normalize("garbage").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<NormalizedVersion, ParseError> {
    let trimmed = raw.trim();
    let unprefixed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    let text = unprefixed.replace('-', ".").to_lowercase();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let invalid = || ParseError::Invalid(raw.to_string());
    let caps = VERSION_RE.captures(&text).ok_or_else(invalid)?;

    let release = caps["release"]
        .split('.')
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    // A marker without a number counts as 0 (`1.0.beta` == `1.0.beta0`).
    let number = |label: &str, value: &str| -> Result<Option<u64>, ParseError> {
        if caps.name(label).is_none() {
            return Ok(None);
        }
        match caps.name(value) {
            Some(n) => n.as_str().parse().map(Some).map_err(|_| invalid()),
            None => Ok(Some(0)),
        }
    };

    let pre = match (caps.name("pre"), number("pre", "pre_n")?) {
        (Some(label), Some(n)) => Some(match label.as_str() {
            "a" | "alpha" => PreRelease::Alpha(n),
            "b" | "beta" => PreRelease::Beta(n),
            _ => PreRelease::Candidate(n),
        }),
        _ => None,
    };
    let post = number("post", "post_n")?;
    let dev = number("dev", "dev_n")?;
    let local = caps
        .name("local")
        .map(|m| {
            m.as_str()
                .split(['.', '_'])
                .map(|part| {
                    if part.bytes().all(|b| b.is_ascii_digit()) {
                        part.parse().map(LocalSegment::Number).map_err(|_| invalid())
                    } else {
                        Ok(LocalSegment::Text(part.to_string()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(NormalizedVersion {
        text,
        release,
        pre,
        post,
        dev,
        local,
    })
}

/// How the local version relates to the latest published one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LocalOlder,
    Equal,
    /// Local build is ahead of the latest tag, typically a development build.
    LocalNewer,
    /// At least one side failed to parse and the raw strings differ.
    Incomparable,
    /// No local version was detected.
    UnknownLocal,
}

impl Comparison {
    /// Whether the latest release should be treated as new for this install.
    pub fn indicates_update(self) -> bool {
        matches!(
            self,
            Comparison::LocalOlder | Comparison::Incomparable | Comparison::UnknownLocal
        )
    }
}

/// Compares a locally detected version against the latest published tag.
///
/// When either side cannot be normalized this falls back to exact string
/// equality. That fallback is an approximation: it can tell `Equal` from
/// "different" but not which side is ahead.
pub fn compare(local: Option<&str>, latest: &str) -> Comparison {
    let Some(local) = local.map(str::trim).filter(|s| !s.is_empty()) else {
        return Comparison::UnknownLocal;
    };
    let latest = latest.trim();

    match (normalize(local), normalize(latest)) {
        (Ok(local_v), Ok(latest_v)) => match local_v.cmp(&latest_v) {
            Ordering::Less => Comparison::LocalOlder,
            Ordering::Equal => Comparison::Equal,
            Ordering::Greater => Comparison::LocalNewer,
        },
        (local_parsed, latest_parsed) => {
            let error = local_parsed.err().or(latest_parsed.err());
            debug!(local, latest, ?error, "falling back to string comparison");
            if local == latest {
                Comparison::Equal
            } else {
                Comparison::Incomparable
            }
        }
    }
}
