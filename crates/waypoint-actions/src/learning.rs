//! Onboarding plan actions: learning paths, tasks and task imports.

use std::time::Instant;

use tracing::{info, trace, warn};
use uuid::Uuid;

use waypoint_core::defaults::ONBOARDING_PAGE;
use waypoint_core::import::is_http_url;
use waypoint_core::{
    csv_task_rows, pipe_task_rows, Attachment, Error, ImportSummary, LearningPath, LearningPlan,
    LearningTask, Parsed, Result, TaskRow, UpdateTaskRequest, UpsertOutcome, UpsertTaskRequest,
    ALL_ROLES, CURATOR_ROLES,
};

use crate::auth::authorize;
use crate::portal::{onboarding_page, Portal};
use crate::records::validate_title;

/// Edit of a learning path; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PathUpdate {
    pub title: Option<String>,
    pub sort_order: Option<i32>,
}

/// Slugs are lowercase ASCII letters, digits and single hyphens.
fn validate_slug(slug: &str) -> Result<String> {
    let slug = slug.trim();
    let valid = !slug.is_empty()
        && slug.len() <= 64
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");
    if !valid {
        return Err(Error::InvalidInput(format!("Invalid path slug: {}", slug)));
    }
    Ok(slug.to_string())
}

fn validate_day(day: Option<i32>) -> Result<Option<i32>> {
    match day {
        Some(d) if d < 1 => Err(Error::InvalidInput(format!("Day must be at least 1, got {}", d))),
        other => Ok(other),
    }
}

fn validate_attachments(attachments: &[Attachment]) -> Result<()> {
    for attachment in attachments {
        if !is_http_url(&attachment.url) && !attachment.url.starts_with('/') {
            return Err(Error::InvalidInput(format!(
                "Invalid attachment URL: {}",
                attachment.url
            )));
        }
    }
    Ok(())
}

/// Group tasks (already ordered by day then position) into days plus extras.
pub fn group_plan(path: LearningPath, tasks: Vec<LearningTask>) -> LearningPlan {
    let mut days: Vec<(i32, Vec<LearningTask>)> = Vec::new();
    let mut extras = Vec::new();
    for task in tasks {
        match task.day {
            None => extras.push(task),
            Some(day) => match days.iter_mut().find(|(d, _)| *d == day) {
                Some((_, bucket)) => bucket.push(task),
                None => days.push((day, vec![task])),
            },
        }
    }
    days.sort_by_key(|(day, _)| *day);
    for (_, bucket) in days.iter_mut() {
        bucket.sort_by_key(|t| t.position);
    }
    extras.sort_by_key(|t| t.position);
    LearningPlan { path, days, extras }
}

impl Portal {
    async fn path_by_slug(&self, slug: &str) -> Result<LearningPath> {
        self.learning
            .find_path(slug)
            .await?
            .ok_or_else(|| Error::PathNotFound(slug.to_string()))
    }

    /// Slug of the path owning `path_id`, for cache invalidation.
    async fn slug_of(&self, path_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .learning
            .list_paths()
            .await?
            .into_iter()
            .find(|p| p.id == path_id)
            .map(|p| p.slug))
    }

    async fn revalidate_path_pages(&self, slug: Option<&str>) {
        match slug {
            Some(slug) => {
                self.revalidate([ONBOARDING_PAGE.to_string(), onboarding_page(slug)])
                    .await
            }
            None => self.revalidate([ONBOARDING_PAGE]).await,
        }
    }

    /// Create a path at the end of the display order.
    pub async fn create_path(&self, slug: &str, title: &str) -> Result<LearningPath> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "create_path").await?;
        let slug = validate_slug(slug)?;
        let title = validate_title(title)?;

        let path = self.learning.create_path(&slug, &title).await?;
        info!(
            subsystem = "actions",
            component = "learning",
            op = "create_path",
            user_id = %session.user_id,
            path_slug = %path.slug,
            sort_order = path.sort_order,
            "Learning path created"
        );
        self.revalidate_path_pages(Some(&path.slug)).await;
        Ok(path)
    }

    pub async fn update_path(&self, slug: &str, update: PathUpdate) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "update_path").await?;
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let path = self.path_by_slug(slug).await?;

        self.learning
            .update_path(path.id, title.as_deref(), update.sort_order)
            .await?;
        info!(
            subsystem = "actions",
            component = "learning",
            op = "update_path",
            user_id = %session.user_id,
            path_slug = %slug,
            "Learning path updated"
        );
        self.revalidate_path_pages(Some(slug)).await;
        Ok(())
    }

    /// Delete a path together with its tasks.
    pub async fn delete_path(&self, slug: &str) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "delete_path").await?;
        let path = self.path_by_slug(slug).await?;

        self.learning.delete_path(path.id).await?;
        info!(
            subsystem = "actions",
            component = "learning",
            op = "delete_path",
            user_id = %session.user_id,
            path_slug = %slug,
            "Learning path deleted"
        );
        self.revalidate_path_pages(Some(slug)).await;
        Ok(())
    }

    pub async fn list_paths(&self) -> Result<Vec<LearningPath>> {
        authorize(self.sessions.as_ref(), ALL_ROLES, "list_paths").await?;
        self.learning.list_paths().await
    }

    /// A path's tasks grouped into ordered days plus extras.
    pub async fn learning_plan(&self, slug: &str) -> Result<LearningPlan> {
        authorize(self.sessions.as_ref(), ALL_ROLES, "learning_plan").await?;
        let path = self.path_by_slug(slug).await?;
        let tasks = self.learning.list_tasks(path.id).await?;
        Ok(group_plan(path, tasks))
    }

    /// Manual task form: insert or update by `(path, day, title)`.
    pub async fn save_task(&self, slug: &str, req: UpsertTaskRequest) -> Result<UpsertOutcome> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "save_task").await?;
        let req = UpsertTaskRequest {
            title: validate_title(&req.title)?,
            day: validate_day(req.day)?,
            ..req
        };
        validate_attachments(&req.attachments)?;
        let path = self.path_by_slug(slug).await?;

        let outcome = self.learning.upsert_task(path.id, req).await?;
        info!(
            subsystem = "actions",
            component = "learning",
            op = "save_task",
            user_id = %session.user_id,
            path_slug = %slug,
            task_id = %outcome.id,
            created = outcome.created,
            "Task saved"
        );
        self.revalidate_path_pages(Some(slug)).await;
        Ok(outcome)
    }

    /// Edit a task. Moving it to another day appends it to that day.
    pub async fn update_task(&self, id: Uuid, req: UpdateTaskRequest) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "update_task").await?;
        let title = req.title.as_deref().map(validate_title).transpose()?;
        let day = req.day.map(validate_day).transpose()?;
        if let Some(attachments) = &req.attachments {
            validate_attachments(attachments)?;
        }

        let task = self.learning.fetch_task(id).await?;
        self.learning
            .update_task(id, UpdateTaskRequest { title, day, ..req })
            .await?;

        info!(
            subsystem = "actions",
            component = "learning",
            op = "update_task",
            user_id = %session.user_id,
            task_id = %id,
            "Task updated"
        );
        let slug = self.slug_of(task.path_id).await?;
        self.revalidate_path_pages(slug.as_deref()).await;
        Ok(())
    }

    /// Delete a task; the remaining positions keep their gaps.
    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "delete_task").await?;
        let task = self.learning.fetch_task(id).await?;
        self.learning.delete_task(id).await?;

        info!(
            subsystem = "actions",
            component = "learning",
            op = "delete_task",
            user_id = %session.user_id,
            task_id = %id,
            "Task deleted"
        );
        let slug = self.slug_of(task.path_id).await?;
        self.revalidate_path_pages(slug.as_deref()).await;
        Ok(())
    }

    /// Import tasks from CSV (`Name, Links, Assignee, Attachment, Detail,
    /// Last modification`) into the path `slug`.
    pub async fn import_tasks_csv(&self, slug: &str, text: &str) -> Result<ImportSummary> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "import_tasks_csv").await?;
        self.import_task_rows("import_tasks_csv", &session.user_id, slug, csv_task_rows(text))
            .await
    }

    /// Import tasks from pipe-delimited lines
    /// (`Day|Title|Program|Description|Trainer|AttachmentName|AttachmentURL`).
    pub async fn import_tasks_pipe(&self, slug: &str, text: &str) -> Result<ImportSummary> {
        let session =
            authorize(self.sessions.as_ref(), CURATOR_ROLES, "import_tasks_pipe").await?;
        self.import_task_rows("import_tasks_pipe", &session.user_id, slug, pipe_task_rows(text))
            .await
    }

    async fn import_task_rows(
        &self,
        op: &'static str,
        user_id: &str,
        slug: &str,
        rows: Vec<Parsed<TaskRow>>,
    ) -> Result<ImportSummary> {
        let start = Instant::now();
        let path = self.path_by_slug(slug).await?;
        let mut summary = ImportSummary::default();

        for parsed in rows {
            let row = match parsed {
                Parsed::Row(row) => row,
                Parsed::Skip { line, reason } => {
                    trace!(subsystem = "import", op, line, ?reason, "Row skipped");
                    summary.skipped += 1;
                    continue;
                }
            };
            let line = row.line;

            let req = UpsertTaskRequest {
                day: row.day,
                title: row.title,
                program_md: row.program_md,
                note_md: row.note_md,
                trainer: row.trainer,
                attachments: row.attachments,
            };
            let result = match validate_day(req.day) {
                Ok(_) => self.learning.upsert_task(path.id, req).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) if outcome.created => summary.added.push(outcome.id),
                Ok(outcome) => summary.updated.push(outcome.id),
                Err(e) => {
                    warn!(
                        subsystem = "import",
                        op,
                        path_slug = %slug,
                        line,
                        error = %e,
                        "Row import failed"
                    );
                    summary.record_error(line, e.to_string());
                }
            }
        }

        info!(
            subsystem = "import",
            op,
            user_id,
            path_slug = %slug,
            added = summary.added.len(),
            updated = summary.updated.len(),
            skipped = summary.skipped,
            failed = summary.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Task import finished"
        );
        if !summary.added.is_empty() || !summary.updated.is_empty() {
            self.revalidate_path_pages(Some(slug)).await;
        }
        Ok(summary)
    }
}
