//! In-memory store.
//!
//! Implements every repository trait behind one mutex with the same
//! observable semantics as the PostgreSQL store (natural keys, per-bucket
//! positions, atomic invite consumption). Used by tests and local runs
//! without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use waypoint_core::{
    CreateInviteRequest, CreateRecordRequest, Error, Invite, InviteRepository, LearningPath,
    LearningRepository, LearningTask, RecordKind, RecordRepository, Result, TagFilter,
    TaggedRecord, UpdateRecordRequest, UpdateTaskRequest, UpsertOutcome, UpsertTaskRequest,
};

#[derive(Default)]
struct State {
    records: Vec<TaggedRecord>,
    paths: Vec<LearningPath>,
    tasks: Vec<LearningTask>,
    invites: HashMap<String, Invite>,
}

impl State {
    fn next_position(&self, path_id: Uuid, day: Option<i32>) -> i32 {
        self.tasks
            .iter()
            .filter(|t| t.path_id == path_id && t.day == day)
            .map(|t| t.position)
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordRepository for MemoryStore {
    async fn insert(&self, req: CreateRecordRequest) -> Result<Uuid> {
        if req.title.is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".into()));
        }
        let now = Utc::now();
        let record = TaggedRecord {
            id: Uuid::now_v7(),
            kind: req.kind,
            title: req.title,
            path: req.path,
            tags: req.tags,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.state.lock().await.records.push(record);
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<TaggedRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(Error::RecordNotFound(id))
    }

    async fn find_by_path(&self, kind: RecordKind, path: &str) -> Result<Option<TaggedRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .records
            .iter()
            .find(|r| r.kind == kind && r.path == path)
            .cloned())
    }

    async fn update(&self, id: Uuid, req: UpdateRecordRequest) -> Result<()> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(Error::RecordNotFound(id))?;
        if let Some(title) = req.title {
            record.title = title;
        }
        if let Some(path) = req.path {
            record.path = path;
        }
        if let Some(tags) = req.tags {
            record.tags = tags;
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(Error::RecordNotFound(id));
        }
        Ok(())
    }

    async fn list(&self, kind: RecordKind, filter: &TagFilter) -> Result<Vec<TaggedRecord>> {
        let state = self.state.lock().await;
        // Newest first; insertion order breaks created_at ties.
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.kind == kind && filter.matches(&r.tags))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LearningRepository for MemoryStore {
    async fn create_path(&self, slug: &str, title: &str) -> Result<LearningPath> {
        let mut state = self.state.lock().await;
        if state.paths.iter().any(|p| p.slug == slug) {
            return Err(Error::InvalidInput(format!(
                "Learning path slug already exists: {}",
                slug
            )));
        }
        let path = LearningPath {
            id: Uuid::now_v7(),
            slug: slug.to_string(),
            title: title.to_string(),
            sort_order: state.paths.iter().map(|p| p.sort_order).max().unwrap_or(0) + 1,
            created_at: Utc::now(),
        };
        state.paths.push(path.clone());
        Ok(path)
    }

    async fn find_path(&self, slug: &str) -> Result<Option<LearningPath>> {
        Ok(self
            .state
            .lock()
            .await
            .paths
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn list_paths(&self) -> Result<Vec<LearningPath>> {
        let mut paths = self.state.lock().await.paths.clone();
        paths.sort_by_key(|p| (p.sort_order, p.created_at));
        Ok(paths)
    }

    async fn update_path(
        &self,
        id: Uuid,
        title: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let path = state
            .paths
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("Learning path {}", id)))?;
        if let Some(title) = title {
            path.title = title.to_string();
        }
        if let Some(order) = sort_order {
            path.sort_order = order;
        }
        Ok(())
    }

    async fn delete_path(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.paths.len();
        state.paths.retain(|p| p.id != id);
        if state.paths.len() == before {
            return Err(Error::NotFound(format!("Learning path {}", id)));
        }
        state.tasks.retain(|t| t.path_id != id);
        Ok(())
    }

    async fn upsert_task(&self, path_id: Uuid, req: UpsertTaskRequest) -> Result<UpsertOutcome> {
        let mut state = self.state.lock().await;
        if !state.paths.iter().any(|p| p.id == path_id) {
            return Err(Error::NotFound(format!("Learning path {}", path_id)));
        }
        let now = Utc::now();

        if let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.path_id == path_id && t.day == req.day && t.title == req.title)
        {
            task.program_md = req.program_md;
            task.note_md = req.note_md;
            task.trainer = req.trainer;
            task.attachments = req.attachments;
            task.updated_at = now;
            return Ok(UpsertOutcome {
                id: task.id,
                created: false,
            });
        }

        let task = LearningTask {
            id: Uuid::now_v7(),
            path_id,
            day: req.day,
            position: state.next_position(path_id, req.day),
            title: req.title,
            program_md: req.program_md,
            note_md: req.note_md,
            trainer: req.trainer,
            attachments: req.attachments,
            created_at: now,
            updated_at: now,
        };
        let id = task.id;
        state.tasks.push(task);
        Ok(UpsertOutcome { id, created: true })
    }

    async fn fetch_task(&self, id: Uuid) -> Result<LearningTask> {
        self.state
            .lock()
            .await
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(Error::TaskNotFound(id))
    }

    async fn update_task(&self, id: Uuid, req: UpdateTaskRequest) -> Result<()> {
        let mut state = self.state.lock().await;
        let current = state
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(Error::TaskNotFound(id))?;

        let day = req.day.unwrap_or(current.day);
        let title = req.title.unwrap_or_else(|| current.title.clone());
        if state
            .tasks
            .iter()
            .any(|t| t.id != id && t.path_id == current.path_id && t.day == day && t.title == title)
        {
            return Err(Error::InvalidInput(format!(
                "A task titled '{}' already exists for that day",
                title
            )));
        }
        let position = if day != current.day {
            state.next_position(current.path_id, day)
        } else {
            current.position
        };

        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))?;
        task.day = day;
        task.title = title;
        task.position = position;
        if let Some(program) = req.program_md {
            task.program_md = program;
        }
        if let Some(note) = req.note_md {
            task.note_md = note;
        }
        if let Some(trainer) = req.trainer {
            task.trainer = trainer;
        }
        if let Some(attachments) = req.attachments {
            task.attachments = attachments;
        }
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(Error::TaskNotFound(id));
        }
        Ok(())
    }

    async fn list_tasks(&self, path_id: Uuid) -> Result<Vec<LearningTask>> {
        let mut tasks: Vec<LearningTask> = self
            .state
            .lock()
            .await
            .tasks
            .iter()
            .filter(|t| t.path_id == path_id)
            .cloned()
            .collect();
        // Days ascending, extras (None) last.
        tasks.sort_by_key(|t| (t.day.is_none(), t.day, t.position));
        Ok(tasks)
    }
}

#[async_trait]
impl InviteRepository for MemoryStore {
    async fn create(&self, req: CreateInviteRequest) -> Result<Invite> {
        let mut state = self.state.lock().await;
        if state.invites.contains_key(&req.token) {
            return Err(Error::InvalidInput("Invite token already exists".into()));
        }
        let invite = Invite {
            token: req.token,
            role: req.role,
            email: req.email,
            expires_at: req.expires_at,
            used_at: None,
            created_at: Utc::now(),
        };
        state.invites.insert(invite.token.clone(), invite.clone());
        Ok(invite)
    }

    async fn find(&self, token: &str) -> Result<Option<Invite>> {
        Ok(self.state.lock().await.invites.get(token).cloned())
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Invite>> {
        let mut state = self.state.lock().await;
        match state.invites.get_mut(token) {
            Some(invite) if invite.is_consumable(now) => {
                invite.used_at = Some(now);
                Ok(Some(invite.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn revoke(&self, token: &str) -> Result<bool> {
        Ok(self.state.lock().await.invites.remove(token).is_some())
    }

    async fn list(&self) -> Result<Vec<Invite>> {
        let mut invites: Vec<Invite> = self.state.lock().await.invites.values().cloned().collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }
}
