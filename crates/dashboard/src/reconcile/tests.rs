use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::TimeZone;
use tokio::sync::Barrier;

use super::*;
use crate::db::{DbClient, ProjectUpdate};
use crate::github::{RemoteError, RepositoryActivity};

fn remote(id: i64, name: &str) -> RemoteRepositorySummary {
    RemoteRepositorySummary {
        id,
        name: name.to_string(),
        description: Some(format!("{name} description")),
        language: Some("Rust".to_string()),
        star_count: 3,
        fork_count: 1,
        updated_at: Utc
            .with_ymd_and_hms(2024, 5, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp"),
        url: format!("https://github.com/octo/{name}"),
        is_fork: false,
    }
}

struct StubFetcher {
    listing: Mutex<Option<RemoteListing>>,
}

impl StubFetcher {
    fn returning(items: Vec<RemoteRepositorySummary>) -> Self {
        let total_count = u64::try_from(items.len()).expect("count fits");
        Self {
            listing: Mutex::new(Some(RemoteListing { total_count, items })),
        }
    }

    fn failing() -> Self {
        Self {
            listing: Mutex::new(None),
        }
    }

    fn replace(&self, items: Vec<RemoteRepositorySummary>) {
        let total_count = u64::try_from(items.len()).expect("count fits");
        *self.listing.lock().expect("stub lock") = Some(RemoteListing { total_count, items });
    }
}

#[async_trait]
impl RepositoryFetcher for StubFetcher {
    async fn fetch_repositories(&self, _username: &str) -> Result<RemoteListing, RemoteError> {
        self.listing
            .lock()
            .expect("stub lock")
            .clone()
            .ok_or_else(|| RemoteError::Unavailable("connection refused".to_string()))
    }

    async fn fetch_activity(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<RepositoryActivity, RemoteError> {
        Err(RemoteError::Unavailable("not used".to_string()))
    }
}

/// Wraps the real store and counts calls; optionally fails reads or writes.
struct InstrumentedStore {
    inner: DbClient,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: bool,
    fail_writes: bool,
}

impl InstrumentedStore {
    fn new(inner: DbClient) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_reads: false,
            fail_writes: false,
        }
    }
}

#[async_trait]
impl ProjectStore for InstrumentedStore {
    async fn find_all_projects_by_owner(&self, owner: &str) -> anyhow::Result<Vec<ProjectRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(anyhow!("database is locked"));
        }
        self.inner.find_all_projects_by_owner(owner).await
    }

    async fn create_projects_if_absent(&self, records: &[ProjectRecord]) -> anyhow::Result<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(anyhow!("disk I/O error"));
        }
        self.inner.create_projects_if_absent(records).await
    }

    async fn update_project(
        &self,
        owner: &str,
        id: &str,
        fields: ProjectUpdate,
    ) -> anyhow::Result<bool> {
        ProjectStore::update_project(&self.inner, owner, id, fields).await
    }
}

/// Holds every pass after its read until both passes have read, so both see
/// an empty store and race on the insert.
struct LockstepStore {
    inner: DbClient,
    after_read: Barrier,
}

#[async_trait]
impl ProjectStore for LockstepStore {
    async fn find_all_projects_by_owner(&self, owner: &str) -> anyhow::Result<Vec<ProjectRecord>> {
        let records = self.inner.find_all_projects_by_owner(owner).await;
        self.after_read.wait().await;
        records
    }

    async fn create_projects_if_absent(&self, records: &[ProjectRecord]) -> anyhow::Result<u64> {
        self.inner.create_projects_if_absent(records).await
    }

    async fn update_project(
        &self,
        owner: &str,
        id: &str,
        fields: ProjectUpdate,
    ) -> anyhow::Result<bool> {
        ProjectStore::update_project(&self.inner, owner, id, fields).await
    }
}

async fn temp_db() -> DbClient {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let db_path = tempdir.path().join("jnf.db");
    std::mem::forget(tempdir);
    DbClient::initialize(&db_path.to_string_lossy())
        .await
        .expect("db init")
}

#[test]
fn merge_prefers_remote_descriptions_and_stored_annotations() {
    let record = ProjectRecord {
        id: "42".to_string(),
        owner_username: "octo".to_string(),
        name: "old-name".to_string(),
        progress: 75,
        reminder_enabled: true,
    };

    let merged = merge(remote(42, "new-name"), Some(&record));
    assert_eq!(merged.name, "new-name");
    assert_eq!(merged.progress, 75);
    assert!(merged.reminder_enabled);

    let fresh = merge(remote(7, "fresh"), None);
    assert_eq!(fresh.progress, 0);
    assert!(!fresh.reminder_enabled);
}

#[test]
fn empty_state_distinguishes_outage_from_empty_account() {
    assert_eq!(
        Reconciliation::default().empty_state(),
        Some(EmptyState::NoRepositories)
    );
    assert_eq!(
        Reconciliation::degraded().empty_state(),
        Some(EmptyState::RemoteUnavailable)
    );

    let populated = Reconciliation {
        total_count: 1,
        items: vec![merge(remote(1, "one"), None)],
        remote_unavailable: false,
    };
    assert_eq!(populated.empty_state(), None);
}

#[tokio::test]
async fn creates_one_record_per_new_repository() {
    let db = temp_db().await;
    let fetcher = StubFetcher::returning(vec![remote(1, "one"), remote(2, "two"), remote(3, "three")]);

    let result = reconcile(&fetcher, &db, "octo").await.expect("reconcile");
    assert_eq!(result.total_count, 3);
    assert_eq!(result.items.len(), 3);
    assert!(!result.remote_unavailable);

    let stored = db.list_projects_for_owner("octo").await.expect("list");
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .all(|record| record.progress == 0 && !record.reminder_enabled));
    let names = result.items.iter().map(|item| item.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn second_pass_is_idempotent_and_keeps_annotations() {
    let db = temp_db().await;
    let fetcher = StubFetcher::returning(vec![remote(1, "one"), remote(2, "two")]);

    reconcile(&fetcher, &db, "octo").await.expect("first pass");
    db.update_project("octo", "2", ProjectUpdate::progress(40))
        .await
        .expect("progress");
    let after_first = db.list_projects_for_owner("octo").await.expect("list");

    reconcile(&fetcher, &db, "octo").await.expect("second pass");
    let after_second = db.list_projects_for_owner("octo").await.expect("list");

    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn existing_annotations_are_reported_not_reset() {
    let db = temp_db().await;
    db.insert_projects_if_absent(&[ProjectRecord {
        id: "42".to_string(),
        owner_username: "octo".to_string(),
        name: "answer".to_string(),
        progress: 75,
        reminder_enabled: true,
    }])
    .await
    .expect("seed");

    let fetcher = StubFetcher::returning(vec![remote(42, "answer"), remote(43, "question")]);
    let result = reconcile(&fetcher, &db, "octo").await.expect("reconcile");

    let answer = result.items.iter().find(|item| item.id == 42).expect("42");
    assert_eq!(answer.progress, 75);
    assert!(answer.reminder_enabled);

    let question = result.items.iter().find(|item| item.id == 43).expect("43");
    assert_eq!(question.progress, 0);
    assert!(!question.reminder_enabled);

    let stored = db.get_project("octo", "42").await.expect("get").expect("row");
    assert_eq!(stored.progress, 75);
    assert!(stored.reminder_enabled);
}

#[tokio::test]
async fn owners_never_see_each_others_records() {
    let db = temp_db().await;
    let fetcher = StubFetcher::returning(vec![remote(42, "shared")]);

    reconcile(&fetcher, &db, "alice").await.expect("alice pass");
    db.update_project("alice", "42", ProjectUpdate::progress(90))
        .await
        .expect("alice progress");
    db.update_project("alice", "42", ProjectUpdate::reminder(true))
        .await
        .expect("alice reminder");

    let bob = reconcile(&fetcher, &db, "bob").await.expect("bob pass");
    assert_eq!(bob.items[0].progress, 0);
    assert!(!bob.items[0].reminder_enabled);

    let alice_rows = db.list_projects_for_owner("alice").await.expect("alice");
    let bob_rows = db.list_projects_for_owner("bob").await.expect("bob");
    assert_eq!(alice_rows.len(), 1);
    assert_eq!(bob_rows.len(), 1);
    assert_eq!(alice_rows[0].progress, 90);
    assert!(alice_rows[0].reminder_enabled);
}

#[tokio::test]
async fn failed_fetch_degrades_without_touching_the_store() {
    let db = temp_db().await;
    let store = InstrumentedStore::new(db);

    let result = reconcile(&StubFetcher::failing(), &store, "octo")
        .await
        .expect("degrade, not fail");

    assert_eq!(result.total_count, 0);
    assert!(result.items.is_empty());
    assert_eq!(result.empty_state(), Some(EmptyState::RemoteUnavailable));
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_remote_listing_is_not_an_error() {
    let db = temp_db().await;
    let store = InstrumentedStore::new(db);

    let result = reconcile(&StubFetcher::returning(Vec::new()), &store, "octo")
        .await
        .expect("reconcile");

    assert_eq!(result.total_count, 0);
    assert_eq!(result.empty_state(), Some(EmptyState::NoRepositories));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_read_failure_aborts_before_writing() {
    let db = temp_db().await;
    let mut store = InstrumentedStore::new(db);
    store.fail_reads = true;

    let error = reconcile(&StubFetcher::returning(vec![remote(1, "one")]), &store, "octo")
        .await
        .expect_err("read failure is fatal");

    assert!(matches!(error, ReconcileError::StoreRead { .. }));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_write_failure_is_surfaced_distinctly() {
    let db = temp_db().await;
    let mut store = InstrumentedStore::new(db);
    store.fail_writes = true;

    let error = reconcile(&StubFetcher::returning(vec![remote(1, "one")]), &store, "octo")
        .await
        .expect_err("write failure is fatal");

    assert!(matches!(error, ReconcileError::StoreWrite { ref owner, .. } if owner == "octo"));
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert!(error.to_string().contains("disk I/O error"));
}

#[tokio::test]
async fn blank_owner_is_rejected() {
    let db = temp_db().await;
    let error = reconcile(&StubFetcher::returning(Vec::new()), &db, "   ")
        .await
        .expect_err("blank owner");
    assert!(matches!(error, ReconcileError::EmptyOwner));
}

#[tokio::test]
async fn duplicate_ids_in_one_listing_create_one_row() {
    let db = temp_db().await;
    let store = InstrumentedStore::new(db.clone());
    let fetcher = StubFetcher::returning(vec![remote(5, "dup"), remote(5, "dup")]);

    let result = reconcile(&fetcher, &store, "octo").await.expect("reconcile");
    assert_eq!(result.items.len(), 2);
    assert_eq!(db.list_projects_for_owner("octo").await.expect("list").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_passes_create_exactly_one_row_per_id() {
    let db = temp_db().await;
    let store = LockstepStore {
        inner: db.clone(),
        after_read: Barrier::new(2),
    };
    let fetcher = StubFetcher::returning(vec![remote(9, "racy"), remote(10, "also-racy")]);

    let (first, second) = tokio::join!(
        reconcile(&fetcher, &store, "octo"),
        reconcile(&fetcher, &store, "octo")
    );
    assert_eq!(first.expect("first pass").items.len(), 2);
    assert_eq!(second.expect("second pass").items.len(), 2);

    let stored = db.list_projects_for_owner("octo").await.expect("list");
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn newly_listed_repositories_are_added_later() {
    let db = temp_db().await;
    let fetcher = StubFetcher::returning(vec![remote(1, "one")]);
    reconcile(&fetcher, &db, "octo").await.expect("first pass");

    fetcher.replace(vec![remote(2, "two")]);
    let result = reconcile(&fetcher, &db, "octo").await.expect("second pass");
    assert_eq!(result.items.len(), 1);

    // Repositories gone from the remote keep their rows.
    let stored = db.list_projects_for_owner("octo").await.expect("list");
    assert_eq!(stored.len(), 2);
}
