//! Learning path and task repository.
//!
//! Tasks are keyed by `(path_id, day, title)` and ordered by a per-bucket
//! `position`. Both are backed by `UNIQUE NULLS NOT DISTINCT` constraints so
//! extras (`day IS NULL`) form one bucket. New positions are claimed with
//! `INSERT .. SELECT MAX(position) + 1 .. ON CONFLICT DO NOTHING` and retried
//! when a concurrent writer took the same slot.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, types::Json, Pool, Postgres, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use waypoint_core::defaults::POSITION_CLAIM_RETRIES;
use waypoint_core::{
    Attachment, Error, LearningPath, LearningRepository, LearningTask, Result, UpdateTaskRequest,
    UpsertOutcome, UpsertTaskRequest,
};

use crate::capabilities::Capabilities;

const NATURAL_KEY_CONSTRAINT: &str = "learning_task_natural_key";
const POSITION_CONSTRAINT: &str = "learning_task_position_key";
const SLUG_CONSTRAINT: &str = "learning_path_slug_key";

/// Render attachments as markdown links appended to a note.
///
/// Used when the schema has no attachments column.
pub fn fold_attachments_into_note(note: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return note.to_string();
    }
    let links = attachments
        .iter()
        .map(|a| format!("- [{}]({})", a.name, a.url))
        .collect::<Vec<_>>()
        .join("\n");
    if note.trim().is_empty() {
        links
    } else {
        format!("{}\n\n{}", note.trim_end(), links)
    }
}

/// Split a folded note back into its text and the trailing link block.
///
/// Inverse of [`fold_attachments_into_note`]: only the run of `- [name](url)`
/// lines at the end of the note counts as attachments.
pub fn unfold_attachments_from_note(stored: &str) -> (String, Vec<Attachment>) {
    let lines: Vec<&str> = stored.lines().collect();
    let mut split = lines.len();
    let mut attachments = Vec::new();
    while split > 0 {
        match parse_folded_link(lines[split - 1]) {
            Some(attachment) => {
                attachments.push(attachment);
                split -= 1;
            }
            None => break,
        }
    }
    if attachments.is_empty() {
        return (stored.to_string(), attachments);
    }
    attachments.reverse();
    (lines[..split].join("\n").trim_end().to_string(), attachments)
}

fn parse_folded_link(line: &str) -> Option<Attachment> {
    let inner = line.trim_end().strip_prefix("- [")?.strip_suffix(')')?;
    let (name, url) = inner.rsplit_once("](")?;
    (!url.is_empty() && !url.contains(char::is_whitespace)).then(|| Attachment::new(name, url))
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// PostgreSQL implementation of LearningRepository.
#[derive(Clone)]
pub struct PgLearningRepository {
    pool: Pool<Postgres>,
    caps: Capabilities,
}

impl PgLearningRepository {
    pub fn new(pool: Pool<Postgres>, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    fn task_columns(&self) -> &'static str {
        if self.caps.task_attachments {
            "id, path_id, day, title, program_md, note_md, trainer, attachments, position, created_at, updated_at"
        } else {
            "id, path_id, day, title, program_md, note_md, trainer, position, created_at, updated_at"
        }
    }

    fn row_to_task(&self, row: &PgRow) -> LearningTask {
        let (note_md, attachments) = if self.caps.task_attachments {
            (
                row.get("note_md"),
                row.get::<Json<Vec<Attachment>>, _>("attachments").0,
            )
        } else {
            unfold_attachments_from_note(row.get::<&str, _>("note_md"))
        };
        LearningTask {
            id: row.get("id"),
            path_id: row.get("path_id"),
            day: row.get("day"),
            title: row.get("title"),
            program_md: row.get("program_md"),
            note_md,
            trainer: row.get("trainer"),
            attachments,
            position: row.get("position"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Note text to store, folding attachments in on legacy schemas.
    fn stored_note(&self, note: &str, attachments: &[Attachment]) -> String {
        if self.caps.task_attachments {
            note.to_string()
        } else {
            fold_attachments_into_note(note, attachments)
        }
    }

    async fn find_task_id(&self, path_id: Uuid, day: Option<i32>, title: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            r#"
            SELECT id FROM learning_task
            WHERE path_id = $1 AND day IS NOT DISTINCT FROM $2 AND title = $3
            "#,
        )
        .bind(path_id)
        .bind(day)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn overwrite_task(&self, id: Uuid, req: &UpsertTaskRequest) -> Result<()> {
        let note = self.stored_note(&req.note_md, &req.attachments);
        let sql = if self.caps.task_attachments {
            "UPDATE learning_task SET program_md = $2, note_md = $3, trainer = $4, updated_at = $5, attachments = $6 WHERE id = $1"
        } else {
            "UPDATE learning_task SET program_md = $2, note_md = $3, trainer = $4, updated_at = $5 WHERE id = $1"
        };
        let mut query = sqlx::query(sql)
            .bind(id)
            .bind(&req.program_md)
            .bind(&note)
            .bind(&req.trainer)
            .bind(Utc::now());
        if self.caps.task_attachments {
            query = query.bind(Json(&req.attachments));
        }
        query.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }

    /// Try to insert at the next free position; `None` when a unique
    /// constraint was hit by a concurrent writer.
    async fn try_insert_task(&self, path_id: Uuid, req: &UpsertTaskRequest) -> Result<Option<Uuid>> {
        let id = Uuid::now_v7();
        let note = self.stored_note(&req.note_md, &req.attachments);
        let (extra_col, extra_val) = if self.caps.task_attachments {
            (", attachments", ", $8")
        } else {
            ("", "")
        };
        let sql = format!(
            r#"
            INSERT INTO learning_task
                (id, path_id, day, title, program_md, note_md, trainer, position, created_at, updated_at{extra_col})
            SELECT $1, $2, $3, $4, $5, $6, $7, COALESCE(MAX(position), 0) + 1, now(), now(){extra_val}
            FROM learning_task
            WHERE path_id = $2 AND day IS NOT DISTINCT FROM $3
            ON CONFLICT DO NOTHING
            RETURNING id
            "#
        );
        let mut query = sqlx::query(&sql)
            .bind(id)
            .bind(path_id)
            .bind(req.day)
            .bind(&req.title)
            .bind(&req.program_md)
            .bind(&note)
            .bind(&req.trainer);
        if self.caps.task_attachments {
            query = query.bind(Json(&req.attachments));
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("id")))
    }
}

#[async_trait]
impl LearningRepository for PgLearningRepository {
    async fn create_path(&self, slug: &str, title: &str) -> Result<LearningPath> {
        let id = Uuid::now_v7();
        // MAX + 1 in one statement; two concurrent creates may share a sort_order.
        let row = sqlx::query(
            r#"
            INSERT INTO learning_path (id, slug, title, sort_order, created_at)
            SELECT $1, $2, $3, COALESCE(MAX(sort_order), 0) + 1, now()
            FROM learning_path
            RETURNING id, slug, title, sort_order, created_at
            "#,
        )
        .bind(id)
        .bind(slug)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some(SLUG_CONSTRAINT) => {
                Error::InvalidInput(format!("Learning path slug already exists: {}", slug))
            }
            _ => Error::Database(e),
        })?;

        Ok(LearningPath {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            sort_order: row.get("sort_order"),
            created_at: row.get("created_at"),
        })
    }

    async fn find_path(&self, slug: &str) -> Result<Option<LearningPath>> {
        let row = sqlx::query(
            "SELECT id, slug, title, sort_order, created_at FROM learning_path WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| LearningPath {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            sort_order: row.get("sort_order"),
            created_at: row.get("created_at"),
        }))
    }

    async fn list_paths(&self) -> Result<Vec<LearningPath>> {
        let rows = sqlx::query(
            "SELECT id, slug, title, sort_order, created_at FROM learning_path ORDER BY sort_order, created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| LearningPath {
                id: row.get("id"),
                slug: row.get("slug"),
                title: row.get("title"),
                sort_order: row.get("sort_order"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn update_path(
        &self,
        id: Uuid,
        title: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE learning_path SET title = COALESCE($2, title), sort_order = COALESCE($3, sort_order) WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(sort_order)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Learning path {}", id)));
        }
        Ok(())
    }

    async fn delete_path(&self, id: Uuid) -> Result<()> {
        // Tasks go with the path via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM learning_path WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Learning path {}", id)));
        }
        Ok(())
    }

    async fn upsert_task(&self, path_id: Uuid, req: UpsertTaskRequest) -> Result<UpsertOutcome> {
        for attempt in 0..POSITION_CLAIM_RETRIES {
            if let Some(id) = self.find_task_id(path_id, req.day, &req.title).await? {
                self.overwrite_task(id, &req).await?;
                return Ok(UpsertOutcome { id, created: false });
            }

            if let Some(id) = self.try_insert_task(path_id, &req).await? {
                return Ok(UpsertOutcome { id, created: true });
            }

            debug!(
                subsystem = "db",
                component = "learning",
                op = "upsert_task",
                path_id = %path_id,
                attempt,
                "Task key or position claimed concurrently, retrying"
            );
        }

        warn!(
            subsystem = "db",
            component = "learning",
            op = "upsert_task",
            path_id = %path_id,
            title = %req.title,
            "Gave up claiming a task position"
        );
        Err(Error::Internal(format!(
            "Could not claim a position for task '{}' after {} attempts",
            req.title, POSITION_CLAIM_RETRIES
        )))
    }

    async fn fetch_task(&self, id: Uuid) -> Result<LearningTask> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM learning_task WHERE id = $1",
            self.task_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::TaskNotFound(id))?;
        Ok(self.row_to_task(&row))
    }

    async fn update_task(&self, id: Uuid, req: UpdateTaskRequest) -> Result<()> {
        let current = self.fetch_task(id).await?;

        let day = req.day.unwrap_or(current.day);
        let title = req.title.unwrap_or(current.title);
        let program_md = req.program_md.unwrap_or(current.program_md);
        let trainer = req.trainer.unwrap_or(current.trainer);
        let attachments = req.attachments.unwrap_or(current.attachments);
        let note_md = req.note_md.unwrap_or(current.note_md);
        let note_md = self.stored_note(&note_md, &attachments);
        let moves_bucket = day != current.day;

        let sql = format!(
            r#"
            UPDATE learning_task SET
                day = $2, title = $3, program_md = $4, note_md = $5, trainer = $6,
                updated_at = now(),
                position = CASE WHEN $7 THEN (
                    SELECT COALESCE(MAX(position), 0) + 1 FROM learning_task
                    WHERE path_id = $8 AND day IS NOT DISTINCT FROM $2
                ) ELSE position END
                {}
            WHERE id = $1
            "#,
            if self.caps.task_attachments {
                ", attachments = $9"
            } else {
                ""
            }
        );

        for attempt in 0..POSITION_CLAIM_RETRIES {
            let mut query = sqlx::query(&sql)
                .bind(id)
                .bind(day)
                .bind(&title)
                .bind(&program_md)
                .bind(&note_md)
                .bind(&trainer)
                .bind(moves_bucket)
                .bind(current.path_id);
            if self.caps.task_attachments {
                query = query.bind(Json(&attachments));
            }

            match query.execute(&self.pool).await {
                Ok(result) if result.rows_affected() == 0 => return Err(Error::TaskNotFound(id)),
                Ok(_) => return Ok(()),
                Err(e) => match violated_constraint(&e).as_deref() {
                    Some(NATURAL_KEY_CONSTRAINT) => {
                        return Err(Error::InvalidInput(format!(
                            "A task titled '{}' already exists for that day",
                            title
                        )))
                    }
                    Some(POSITION_CONSTRAINT) => {
                        debug!(
                            subsystem = "db",
                            component = "learning",
                            op = "update_task",
                            task_id = %id,
                            attempt,
                            "Position claimed concurrently, retrying"
                        );
                    }
                    _ => return Err(Error::Database(e)),
                },
            }
        }

        Err(Error::Internal(format!(
            "Could not claim a position for task {} after {} attempts",
            id, POSITION_CLAIM_RETRIES
        )))
    }

    async fn delete_task(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM learning_task WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::TaskNotFound(id));
        }
        Ok(())
    }

    async fn list_tasks(&self, path_id: Uuid) -> Result<Vec<LearningTask>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM learning_task WHERE path_id = $1 ORDER BY day ASC NULLS LAST, position ASC",
            self.task_columns()
        ))
        .bind(path_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(|row| self.row_to_task(row)).collect())
    }
}
