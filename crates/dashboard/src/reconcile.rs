//! Repository reconciliation.
//!
//! Merges the remote repository list for one owner with the locally stored
//! annotations. Unknown repositories get a fresh record (`progress = 0`,
//! reminder off); known ones keep whatever the owner set. Records are never
//! deleted or overwritten here, and only rows belonging to the given owner
//! are read or written.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::ProjectRecord;
use crate::github::{RemoteListing, RemoteRepositorySummary, RepositoryFetcher};
use crate::store::ProjectStore;

/// A remote repository with the owner's annotations attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRepository {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub star_count: u32,
    pub fork_count: u32,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub is_fork: bool,
    pub progress: u8,
    pub reminder_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub total_count: u64,
    pub items: Vec<ReconciledRepository>,
    /// Set when the remote fetch failed and an empty listing was substituted.
    pub remote_unavailable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    NoRepositories,
    RemoteUnavailable,
}

impl Reconciliation {
    fn degraded() -> Self {
        Self {
            total_count: 0,
            items: Vec::new(),
            remote_unavailable: true,
        }
    }

    #[must_use]
    pub fn empty_state(&self) -> Option<EmptyState> {
        if !self.items.is_empty() {
            return None;
        }

        if self.remote_unavailable {
            Some(EmptyState::RemoteUnavailable)
        } else {
            Some(EmptyState::NoRepositories)
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("owner username must not be empty")]
    EmptyOwner,

    #[error("could not load projects for {owner}: {cause:#}")]
    StoreRead { owner: String, cause: anyhow::Error },

    #[error("could not save new projects for {owner}: {cause:#}")]
    StoreWrite { owner: String, cause: anyhow::Error },
}

/// Remote wins for descriptive fields; the stored record wins for annotations.
#[must_use]
pub fn merge(
    remote: RemoteRepositorySummary,
    record: Option<&ProjectRecord>,
) -> ReconciledRepository {
    let (progress, reminder_enabled) =
        record.map_or((0, false), |record| (record.progress, record.reminder_enabled));

    ReconciledRepository {
        id: remote.id,
        name: remote.name,
        description: remote.description,
        language: remote.language,
        star_count: remote.star_count,
        fork_count: remote.fork_count,
        updated_at: remote.updated_at,
        url: remote.url,
        is_fork: remote.is_fork,
        progress,
        reminder_enabled,
    }
}

/// Fetches, diffs against the owner's stored projects, creates the missing
/// ones and returns the merged list in remote order.
///
/// # Errors
///
/// Fails only on store problems. A failed remote fetch yields an empty,
/// `remote_unavailable` result and touches nothing in the store.
pub async fn reconcile(
    fetcher: &dyn RepositoryFetcher,
    store: &dyn ProjectStore,
    owner: &str,
) -> Result<Reconciliation, ReconcileError> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(ReconcileError::EmptyOwner);
    }

    let RemoteListing { total_count, items } = match fetcher.fetch_repositories(owner).await {
        Ok(listing) => listing,
        Err(error) => {
            tracing::warn!(owner, error = %error, "remote fetch failed, showing empty list");
            return Ok(Reconciliation::degraded());
        }
    };

    let existing = store
        .find_all_projects_by_owner(owner)
        .await
        .map_err(|cause| ReconcileError::StoreRead {
            owner: owner.to_string(),
            cause,
        })?;

    let known = existing
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect::<HashMap<_, _>>();

    let mut queued = HashSet::new();
    let new_records = items
        .iter()
        .filter(|remote| {
            let id = remote.id.to_string();
            !known.contains_key(&id) && queued.insert(id)
        })
        .map(|remote| ProjectRecord::untracked(owner, remote))
        .collect::<Vec<_>>();

    if !new_records.is_empty() {
        let inserted = store
            .create_projects_if_absent(&new_records)
            .await
            .map_err(|cause| ReconcileError::StoreWrite {
                owner: owner.to_string(),
                cause,
            })?;

        tracing::info!(
            owner,
            new = new_records.len(),
            inserted,
            "created project records for new repositories"
        );
    }

    let items = items
        .into_iter()
        .map(|remote| {
            let record = known.get(&remote.id.to_string());
            merge(remote, record)
        })
        .collect();

    Ok(Reconciliation {
        total_count,
        items,
        remote_unavailable: false,
    })
}

#[cfg(test)]
mod tests;
