//! GitHub REST API client for release metadata and project activity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::SourceError;

/// Default base URL for the GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("relcheck/", env!("CARGO_PKG_VERSION"));

/// A published release.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReleaseInfo {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Discussion {
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub comments: u64,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Discussion>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Supplies the latest release of a repository.
pub trait ReleaseSource {
    fn fetch_latest(&self, repo: &str) -> Result<ReleaseInfo, SourceError>;
}

/// Recent project activity shown in the update report.
pub trait ActivityFeed {
    fn recent_releases(&self, repo: &str, limit: usize) -> Result<Vec<ReleaseInfo>, SourceError>;
    fn recent_commits(&self, repo: &str, limit: usize) -> Result<Vec<CommitSummary>, SourceError>;
    fn discussions(&self, repo: &str, limit: usize) -> Result<Vec<Discussion>, SourceError>;
}

/// Blocking GitHub API client. Every request is a single attempt bounded by
/// the configured timeout.
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Creates a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, SourceError> {
        let raw = format!("{}{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| SourceError::InvalidResponse(format!("bad URL {raw}: {e}")))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, SourceError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).header("Accept", ACCEPT).send()?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(what.to_string()));
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let exhausted = header("x-ratelimit-remaining").as_deref() == Some("0");
        if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
            return Err(SourceError::RateLimited {
                retry_after_secs: header("retry-after").and_then(|v| v.parse().ok()),
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(SourceError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json::<T>().map_err(|e| {
            warn!("Failed to parse GitHub response for {}: {}", what, e);
            SourceError::InvalidResponse(e.to_string())
        })
    }
}

impl ReleaseSource for GitHubClient {
    fn fetch_latest(&self, repo: &str) -> Result<ReleaseInfo, SourceError> {
        let url = self.url(&format!("/repos/{repo}/releases/latest"), &[])?;
        let release: ReleaseInfo = self.get_json(url, repo)?;
        if release.tag.trim().is_empty() {
            return Err(SourceError::InvalidResponse(
                "latest release has no tag".to_string(),
            ));
        }
        Ok(release)
    }
}

impl ActivityFeed for GitHubClient {
    fn recent_releases(&self, repo: &str, limit: usize) -> Result<Vec<ReleaseInfo>, SourceError> {
        let url = self.url(
            &format!("/repos/{repo}/releases"),
            &[("per_page", limit.to_string())],
        )?;
        let mut releases: Vec<ReleaseInfo> = self.get_json(url, repo)?;
        releases.truncate(limit);
        Ok(releases)
    }

    fn recent_commits(&self, repo: &str, limit: usize) -> Result<Vec<CommitSummary>, SourceError> {
        let url = self.url(
            &format!("/repos/{repo}/commits"),
            &[("per_page", limit.to_string())],
        )?;
        let commits: Vec<CommitResponse> = self.get_json(url, repo)?;
        Ok(commits
            .into_iter()
            .take(limit)
            .map(|c| CommitSummary {
                sha: c.sha,
                message: c.commit.message,
                author: c.commit.author.map(|a| a.name).unwrap_or_default(),
            })
            .collect())
    }

    fn discussions(&self, repo: &str, limit: usize) -> Result<Vec<Discussion>, SourceError> {
        let url = self.url(
            "/search/issues",
            &[
                ("q", format!("repo:{repo} is:discussion")),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
                ("per_page", limit.to_string()),
            ],
        )?;
        let mut found: SearchResponse = self.get_json(url, repo)?;
        found.items.truncate(limit);
        Ok(found.items)
    }
}
