//! Tagged record repository (documents, presentations, uploads).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use waypoint_core::{
    CreateRecordRequest, Error, RecordKind, RecordRepository, Result, TagFilter, TaggedRecord,
    UpdateRecordRequest,
};

const RECORD_COLUMNS: &str = "id, kind, title, path, tags, created_at, updated_at";

/// PostgreSQL implementation of RecordRepository.
#[derive(Clone)]
pub struct PgRecordRepository {
    pool: Pool<Postgres>,
}

impl PgRecordRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &PgRow) -> Result<TaggedRecord> {
    let kind: String = row.get("kind");
    Ok(TaggedRecord {
        id: row.get("id"),
        kind: kind.parse().map_err(Error::Internal)?,
        title: row.get("title"),
        path: row.get("path"),
        tags: row.get("tags"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    async fn insert(&self, req: CreateRecordRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO tagged_record (id, kind, title, path, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(id)
        .bind(req.kind.as_str())
        .bind(&req.title)
        .bind(&req.path)
        .bind(&req.tags)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<TaggedRecord> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM tagged_record WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::RecordNotFound(id))?;
        row_to_record(&row)
    }

    async fn find_by_path(&self, kind: RecordKind, path: &str) -> Result<Option<TaggedRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM tagged_record
             WHERE kind = $1 AND path = $2
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .bind(kind.as_str())
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn update(&self, id: Uuid, req: UpdateRecordRequest) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tagged_record SET
                title = COALESCE($2, title),
                path = COALESCE($3, path),
                tags = COALESCE($4, tags),
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.title)
        .bind(req.path)
        .bind(req.tags)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tagged_record WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound(id));
        }
        Ok(())
    }

    async fn list(&self, kind: RecordKind, filter: &TagFilter) -> Result<Vec<TaggedRecord>> {
        // `@>` on an empty array matches every row, so All needs no branch.
        let wanted: Vec<String> = match filter {
            TagFilter::All => Vec::new(),
            TagFilter::Contains(tag) => vec![tag.clone()],
            TagFilter::ContainsAll(tags) => tags.clone(),
        };

        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM tagged_record
             WHERE kind = $1 AND tags @> $2::text[]
             ORDER BY created_at DESC"
        ))
        .bind(kind.as_str())
        .bind(&wanted)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(row_to_record).collect()
    }
}
