//! Remote repository source: the trait the reconciliation and reminder code
//! depend on, plus the GitHub REST implementation.

use async_trait::async_trait;

mod client;
mod types;

pub use client::GitHubClient;
pub use types::*;

#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Every repository the user owns, plus the host's public repository count.
    ///
    /// Implementations return the complete list for one call, or document
    /// their truncation policy.
    async fn fetch_repositories(&self, username: &str) -> Result<RemoteListing, RemoteError>;

    /// Staleness and size details for one repository.
    async fn fetch_activity(&self, owner: &str, repo: &str)
        -> Result<RepositoryActivity, RemoteError>;
}
