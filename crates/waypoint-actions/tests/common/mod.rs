//! Shared doubles for action tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use waypoint_actions::{Collaborators, Portal, PortalSettings};
use waypoint_core::{
    CreateInviteRequest, CreateRecordRequest, Error, FileStore, Invite, InviteRepository,
    LearningPath, LearningRepository, LearningTask, PageCache, PageFetcher, RecordKind,
    RecordRepository, Result, Role, Session, StaticSession, TagFilter, TaggedRecord,
    UpdateRecordRequest, UpdateTaskRequest, UpsertOutcome, UpsertTaskRequest,
};
use waypoint_db::{DataUriFileStore, MemoryStore};

/// Page cache that remembers what was invalidated.
#[derive(Default)]
pub struct RecordingCache {
    pub paths: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn seen(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageCache for RecordingCache {
    async fn revalidate(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

/// Fetcher serving canned pages; unknown URLs fail.
#[derive(Default)]
pub struct StubFetcher {
    pub pages: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Request(format!("GET {} returned 404 Not Found", url)))
    }
}

/// File store counting persist calls.
#[derive(Default)]
pub struct CountingFiles {
    pub calls: AtomicUsize,
}

#[async_trait]
impl FileStore for CountingFiles {
    async fn persist(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DataUriFileStore.persist(bytes, suggested_name).await
    }
}

/// Store wrapper counting every repository call.
#[derive(Default)]
pub struct SpyStore {
    pub inner: MemoryStore,
    pub calls: AtomicUsize,
}

impl SpyStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordRepository for SpyStore {
    async fn insert(&self, req: CreateRecordRequest) -> Result<Uuid> {
        self.hit();
        RecordRepository::insert(&self.inner, req).await
    }
    async fn fetch(&self, id: Uuid) -> Result<TaggedRecord> {
        self.hit();
        RecordRepository::fetch(&self.inner, id).await
    }
    async fn find_by_path(&self, kind: RecordKind, path: &str) -> Result<Option<TaggedRecord>> {
        self.hit();
        self.inner.find_by_path(kind, path).await
    }
    async fn update(&self, id: Uuid, req: UpdateRecordRequest) -> Result<()> {
        self.hit();
        RecordRepository::update(&self.inner, id, req).await
    }
    async fn delete(&self, id: Uuid) -> Result<()> {
        self.hit();
        RecordRepository::delete(&self.inner, id).await
    }
    async fn list(&self, kind: RecordKind, filter: &TagFilter) -> Result<Vec<TaggedRecord>> {
        self.hit();
        RecordRepository::list(&self.inner, kind, filter).await
    }
}

#[async_trait]
impl LearningRepository for SpyStore {
    async fn create_path(&self, slug: &str, title: &str) -> Result<LearningPath> {
        self.hit();
        self.inner.create_path(slug, title).await
    }
    async fn find_path(&self, slug: &str) -> Result<Option<LearningPath>> {
        self.hit();
        self.inner.find_path(slug).await
    }
    async fn list_paths(&self) -> Result<Vec<LearningPath>> {
        self.hit();
        self.inner.list_paths().await
    }
    async fn update_path(&self, id: Uuid, title: Option<&str>, sort_order: Option<i32>) -> Result<()> {
        self.hit();
        self.inner.update_path(id, title, sort_order).await
    }
    async fn delete_path(&self, id: Uuid) -> Result<()> {
        self.hit();
        self.inner.delete_path(id).await
    }
    async fn upsert_task(&self, path_id: Uuid, req: UpsertTaskRequest) -> Result<UpsertOutcome> {
        self.hit();
        self.inner.upsert_task(path_id, req).await
    }
    async fn fetch_task(&self, id: Uuid) -> Result<LearningTask> {
        self.hit();
        self.inner.fetch_task(id).await
    }
    async fn update_task(&self, id: Uuid, req: UpdateTaskRequest) -> Result<()> {
        self.hit();
        self.inner.update_task(id, req).await
    }
    async fn delete_task(&self, id: Uuid) -> Result<()> {
        self.hit();
        self.inner.delete_task(id).await
    }
    async fn list_tasks(&self, path_id: Uuid) -> Result<Vec<LearningTask>> {
        self.hit();
        self.inner.list_tasks(path_id).await
    }
}

#[async_trait]
impl InviteRepository for SpyStore {
    async fn create(&self, req: CreateInviteRequest) -> Result<Invite> {
        self.hit();
        self.inner.create(req).await
    }
    async fn find(&self, token: &str) -> Result<Option<Invite>> {
        self.hit();
        self.inner.find(token).await
    }
    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Invite>> {
        self.hit();
        self.inner.consume(token, now).await
    }
    async fn revoke(&self, token: &str) -> Result<bool> {
        self.hit();
        self.inner.revoke(token).await
    }
    async fn list(&self) -> Result<Vec<Invite>> {
        self.hit();
        InviteRepository::list(&self.inner).await
    }
}

/// A portal over one in-memory store plus handles to every double.
pub struct Harness {
    pub portal: Portal,
    pub store: Arc<SpyStore>,
    pub cache: Arc<RecordingCache>,
    pub fetcher: Arc<StubFetcher>,
    pub files: Arc<CountingFiles>,
}

pub fn harness(session: Option<Session>) -> Harness {
    harness_with_fetcher(session, StubFetcher::default())
}

pub fn harness_with_fetcher(session: Option<Session>, fetcher: StubFetcher) -> Harness {
    let store = Arc::new(SpyStore::default());
    let cache = Arc::new(RecordingCache::default());
    let fetcher = Arc::new(fetcher);
    let files = Arc::new(CountingFiles::default());
    let portal = Portal::new(
        Collaborators {
            records: store.clone(),
            learning: store.clone(),
            invites: store.clone(),
            sessions: Arc::new(StaticSession(session)),
            files: files.clone(),
            cache: cache.clone(),
            fetcher: fetcher.clone(),
        },
        PortalSettings::default(),
    );
    Harness {
        portal,
        store,
        cache,
        fetcher,
        files,
    }
}

/// The same store viewed through a portal with a different session.
pub fn as_role(h: &Harness, session: Option<Session>) -> Portal {
    with_settings(h, session, PortalSettings::default())
}

/// The same store and doubles under different portal settings.
pub fn with_settings(h: &Harness, session: Option<Session>, settings: PortalSettings) -> Portal {
    Portal::new(
        Collaborators {
            records: h.store.clone(),
            learning: h.store.clone(),
            invites: h.store.clone(),
            sessions: Arc::new(StaticSession(session)),
            files: h.files.clone(),
            cache: h.cache.clone(),
            fetcher: h.fetcher.clone(),
        },
        settings,
    )
}

pub fn admin() -> Option<Session> {
    Some(Session::new("admin-1", Role::Administrator))
}

pub fn trainer() -> Option<Session> {
    Some(Session::new("trainer-1", Role::Trainer))
}

pub fn employee() -> Option<Session> {
    Some(Session::new("employee-1", Role::Employee))
}

pub fn viewer() -> Option<Session> {
    Some(Session::new("viewer-1", Role::Viewer))
}
