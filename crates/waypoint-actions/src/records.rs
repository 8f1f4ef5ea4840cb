//! Document, presentation and upload actions.

use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use waypoint_core::import::{is_http_url, title_from_url};
use waypoint_core::{
    reconcile_tags, validate_file, CreateRecordRequest, Error, RecordKind, Result, TagFilter,
    TagIntent, TaggedRecord, UpdateRecordRequest, ALL_ROLES, CURATOR_ROLES,
};

use crate::auth::authorize;
use crate::portal::Portal;

/// Manual create form.
#[derive(Debug, Clone, Default)]
pub struct RecordForm {
    pub title: String,
    pub path: String,
    pub tags: TagIntent,
}

/// Edit form. `tags: None` means the tag field was not part of the
/// submission and existing tags stay as they are.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub title: Option<String>,
    pub path: Option<String>,
    pub tags: Option<TagIntent>,
}

/// File upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Defaults to a title derived from the file name.
    pub title: Option<String>,
    pub tags: TagIntent,
}

pub(crate) fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Title is required".to_string()));
    }
    Ok(title.to_string())
}

/// Accepts absolute http(s) URLs, site-relative upload paths and `data:` URIs.
pub(crate) fn validate_record_path(path: &str) -> Result<String> {
    let path = path.trim();
    let ok = is_http_url(path)
        || (path.starts_with('/') && !path.starts_with("//") && path.len() > 1)
        || path.starts_with("data:");
    if !ok {
        return Err(Error::InvalidInput(format!("Invalid link: {}", path)));
    }
    Ok(path.to_string())
}

impl Portal {
    /// Create a record with tags built from an empty set.
    pub async fn create_record(&self, kind: RecordKind, form: RecordForm) -> Result<Uuid> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "create_record").await?;
        let title = validate_title(&form.title)?;
        let path = validate_record_path(&form.path)?;
        let tags = reconcile_tags(&[], &form.tags, kind.categories());

        let id = self
            .records
            .insert(CreateRecordRequest {
                kind,
                title,
                path,
                tags,
            })
            .await?;

        info!(
            subsystem = "actions",
            component = "records",
            op = "create_record",
            user_id = %session.user_id,
            record_kind = %kind,
            record_id = %id,
            "Record created"
        );
        self.revalidate([kind.page_path()]).await;
        Ok(id)
    }

    /// Read, reconcile, write. Concurrent edits are last-write-wins.
    pub async fn update_record(&self, id: Uuid, update: RecordUpdate) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "update_record").await?;
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let path = update.path.as_deref().map(validate_record_path).transpose()?;

        let current = self.records.fetch(id).await?;
        let tags = update.tags.as_ref().map(|intent| {
            let next = reconcile_tags(&current.tags, intent, current.kind.categories());
            debug!(
                subsystem = "actions",
                component = "records",
                record_id = %id,
                before = ?current.tags,
                after = ?next,
                "Tags reconciled"
            );
            next
        });

        self.records
            .update(id, UpdateRecordRequest { title, path, tags })
            .await?;

        info!(
            subsystem = "actions",
            component = "records",
            op = "update_record",
            user_id = %session.user_id,
            record_id = %id,
            "Record updated"
        );
        self.revalidate([current.kind.page_path()]).await;
        Ok(())
    }

    pub async fn delete_record(&self, id: Uuid) -> Result<()> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "delete_record").await?;
        let current = self.records.fetch(id).await?;
        self.records.delete(id).await?;

        info!(
            subsystem = "actions",
            component = "records",
            op = "delete_record",
            user_id = %session.user_id,
            record_id = %id,
            "Record deleted"
        );
        self.revalidate([current.kind.page_path()]).await;
        Ok(())
    }

    pub async fn get_record(&self, id: Uuid) -> Result<TaggedRecord> {
        authorize(self.sessions.as_ref(), ALL_ROLES, "get_record").await?;
        self.records.fetch(id).await
    }

    /// Records of one kind, newest first.
    pub async fn list_records(&self, kind: RecordKind, filter: TagFilter) -> Result<Vec<TaggedRecord>> {
        authorize(self.sessions.as_ref(), ALL_ROLES, "list_records").await?;
        let start = Instant::now();
        let records = self.records.list(kind, &filter).await?;
        debug!(
            subsystem = "actions",
            component = "records",
            op = "list_records",
            record_kind = %kind,
            result_count = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed records"
        );
        Ok(records)
    }

    /// Check, persist and register an uploaded file.
    pub async fn upload_record(&self, kind: RecordKind, form: UploadForm) -> Result<Uuid> {
        let session = authorize(self.sessions.as_ref(), CURATOR_ROLES, "upload_record").await?;

        let verdict = validate_file(&form.filename, &form.bytes, self.settings.max_upload_bytes);
        if !verdict.allowed {
            return Err(Error::InvalidInput(
                verdict
                    .block_reason
                    .unwrap_or_else(|| "File rejected".to_string()),
            ));
        }
        let title = match form.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => title_from_url(&form.filename),
        };

        let path = self.files.persist(&form.bytes, &form.filename).await?;
        let tags = reconcile_tags(&[], &form.tags, kind.categories());
        let id = self
            .records
            .insert(CreateRecordRequest {
                kind,
                title,
                path,
                tags,
            })
            .await?;

        info!(
            subsystem = "actions",
            component = "records",
            op = "upload_record",
            user_id = %session.user_id,
            record_kind = %kind,
            record_id = %id,
            size = form.bytes.len(),
            "Upload stored"
        );
        self.revalidate([kind.page_path()]).await;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Handbook ").unwrap(), "Handbook");
        assert!(matches!(validate_title("   "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_record_path() {
        assert!(validate_record_path("https://intranet.example/a.pdf").is_ok());
        assert!(validate_record_path("/uploads/0190-a.pdf").is_ok());
        assert!(validate_record_path("data:application/pdf;base64,JVBERi0=").is_ok());
        assert!(validate_record_path("ftp://x/a.pdf").is_err());
        assert!(validate_record_path("//evil.example/a").is_err());
        assert!(validate_record_path("not a link").is_err());
        assert!(validate_record_path("").is_err());
    }
}
