use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read-only repository metadata as reported by the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRepositorySummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub star_count: u32,
    pub fork_count: u32,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub is_fork: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    pub total_count: u64,
    pub items: Vec<RemoteRepositorySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryActivity {
    pub pushed_at: Option<DateTime<Utc>>,
    pub size_kb: u64,
    pub open_issues: u64,
    pub stars: u64,
    pub url: String,
}

/// Any failure to obtain data from the remote host.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote host unreachable: {0}")]
    Unavailable(String),

    #[error("remote host answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid response from remote host: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Unavailable(error.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubUserResponse {
    pub(super) public_repos: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubRepoApiItem {
    pub(super) id: i64,
    pub(super) name: String,
    pub(super) description: Option<String>,
    pub(super) language: Option<String>,
    #[serde(default)]
    pub(super) stargazers_count: u32,
    #[serde(default)]
    pub(super) forks_count: u32,
    pub(super) updated_at: Option<DateTime<Utc>>,
    pub(super) html_url: String,
    #[serde(default)]
    pub(super) fork: bool,
}

impl GitHubRepoApiItem {
    pub(super) fn into_summary(self, fetched_at: DateTime<Utc>) -> RemoteRepositorySummary {
        RemoteRepositorySummary {
            id: self.id,
            name: self.name,
            description: self.description,
            language: self.language,
            star_count: self.stargazers_count,
            fork_count: self.forks_count,
            updated_at: self.updated_at.unwrap_or(fetched_at),
            url: self.html_url,
            is_fork: self.fork,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubRepoDetails {
    pub(super) pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(super) size: u64,
    #[serde(default)]
    pub(super) open_issues_count: u64,
    #[serde(default)]
    pub(super) stargazers_count: u64,
    pub(super) html_url: String,
}

impl From<GitHubRepoDetails> for RepositoryActivity {
    fn from(details: GitHubRepoDetails) -> Self {
        Self {
            pushed_at: details.pushed_at,
            size_kb: details.size,
            open_issues: details.open_issues_count,
            stars: details.stargazers_count,
            url: details.html_url,
        }
    }
}
