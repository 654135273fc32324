use anyhow::Result;
use async_trait::async_trait;

use crate::db::{DbClient, ProjectRecord, ProjectUpdate};

/// Owner-scoped project persistence used by reconciliation and the annotation actions.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_all_projects_by_owner(&self, owner: &str) -> Result<Vec<ProjectRecord>>;

    /// Inserts every record whose key is not taken yet; duplicates are skipped
    /// silently. Returns how many rows were actually written.
    async fn create_projects_if_absent(&self, records: &[ProjectRecord]) -> Result<u64>;

    /// Returns `false` when the owner has no project with that id.
    async fn update_project(&self, owner: &str, id: &str, fields: ProjectUpdate) -> Result<bool>;
}

#[async_trait]
impl ProjectStore for DbClient {
    async fn find_all_projects_by_owner(&self, owner: &str) -> Result<Vec<ProjectRecord>> {
        self.list_projects_for_owner(owner).await
    }

    async fn create_projects_if_absent(&self, records: &[ProjectRecord]) -> Result<u64> {
        self.insert_projects_if_absent(records).await
    }

    async fn update_project(&self, owner: &str, id: &str, fields: ProjectUpdate) -> Result<bool> {
        DbClient::update_project(self, owner, id, fields).await
    }
}
