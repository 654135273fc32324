use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use http::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;

use super::types::{GitHubRepoApiItem, GitHubRepoDetails, GitHubUserResponse};
use super::{RemoteError, RemoteListing, RepositoryActivity, RepositoryFetcher};

const USER_AGENT: &str = "job-not-finished";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;
const MAX_PAGES: u32 = 10;
const REQUEST_TIMEOUT_SECONDS: u64 = 20;

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("GitHubClient")
            .field("api_base_url", &self.api_base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_base_url: &str, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("failed to build GitHub HTTP client")?;

        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    #[must_use]
    pub fn from_config(config: &crate::config::DashboardConfig) -> Option<Self> {
        match Self::new(&config.github_api_base_url(), config.github_api_token()) {
            Ok(client) => Some(client),
            Err(error) => {
                tracing::error!(error = %error, "GitHub client unavailable");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(token) = self.token.as_deref() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RepositoryFetcher for GitHubClient {
    async fn fetch_repositories(&self, username: &str) -> Result<RemoteListing, RemoteError> {
        let encoded_username = urlencoding::encode(username);
        let profile = self
            .get_json::<GitHubUserResponse>(&format!(
                "{}/users/{encoded_username}",
                self.api_base_url
            ))
            .await?;

        let fetched_at = Utc::now();
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self
                .get_json::<Vec<GitHubRepoApiItem>>(&format!(
                    "{}/users/{encoded_username}/repos?per_page={PAGE_SIZE}&page={page}",
                    self.api_base_url
                ))
                .await?;

            let batch_len = batch.len();
            items.extend(batch.into_iter().map(|item| item.into_summary(fetched_at)));

            if batch_len < PAGE_SIZE {
                break;
            }
            if page == MAX_PAGES {
                tracing::warn!(
                    username,
                    fetched = items.len(),
                    "repository listing truncated at page limit"
                );
            }
        }

        let total_count = profile
            .public_repos
            .unwrap_or_else(|| u64::try_from(items.len()).unwrap_or(u64::MAX));

        tracing::debug!(username, total_count, fetched = items.len(), "fetched repositories");
        Ok(RemoteListing { total_count, items })
    }

    async fn fetch_activity(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryActivity, RemoteError> {
        let details = self
            .get_json::<GitHubRepoDetails>(&format!(
                "{}/repos/{}/{}",
                self.api_base_url,
                urlencoding::encode(owner),
                urlencoding::encode(repo)
            ))
            .await?;

        Ok(details.into())
    }
}
