//! Bulk record imports and reference catalog sync.
//!
//! Every batch authorizes once up front, then isolates failures per row
//! (or per catalog source) into the returned [`ImportSummary`].

use std::time::Instant;

use futures::future::join_all;
use reqwest::Url;
use tracing::{info, trace, warn};
use uuid::Uuid;

use waypoint_core::import::title_from_url;
use waypoint_core::{
    csv_record_rows, extract_catalog_links, reconcile_tags, scrape_page_title, url_rows, Change,
    CreateRecordRequest, ImportSummary, IntegrationGroup, Parsed, RecordKind, RefScope, Result,
    TagIntent, TagSet, UpdateRecordRequest, CURATOR_ROLES,
};

use crate::auth::authorize;
use crate::portal::Portal;
use crate::records::{validate_record_path, validate_title};

/// One external catalog index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    pub url: String,
    /// Tier the discovered files belong to.
    pub scope: RefScope,
}

impl CatalogSource {
    pub fn new(url: impl Into<String>, scope: RefScope) -> Self {
        Self {
            url: url.into(),
            scope,
        }
    }
}

/// Whether a record upsert inserted or updated.
enum Upserted {
    Added(Uuid),
    Updated(Uuid),
}

impl Upserted {
    fn tally(self, summary: &mut ImportSummary) {
        match self {
            Upserted::Added(id) => summary.added.push(id),
            Upserted::Updated(id) => summary.updated.push(id),
        }
    }
}

impl Portal {
    /// Insert or update the record of `kind` at `path` (the natural key).
    ///
    /// New records get `intent` applied to an empty tag list; existing ones
    /// have it reconciled into their current tags.
    async fn upsert_record(
        &self,
        kind: RecordKind,
        title: &str,
        path: &str,
        intent: &TagIntent,
    ) -> Result<Upserted> {
        let title = validate_title(title)?;
        let path = validate_record_path(path)?;

        match self.records.find_by_path(kind, &path).await? {
            Some(existing) => {
                let tags = reconcile_tags(&existing.tags, intent, kind.categories());
                self.records
                    .update(
                        existing.id,
                        UpdateRecordRequest {
                            title: Some(title),
                            path: None,
                            tags: Some(tags),
                        },
                    )
                    .await?;
                Ok(Upserted::Updated(existing.id))
            }
            None => {
                let tags = reconcile_tags(&[], intent, kind.categories());
                let id = self
                    .records
                    .insert(CreateRecordRequest {
                        kind,
                        title,
                        path,
                        tags,
                    })
                    .await?;
                Ok(Upserted::Added(id))
            }
        }
    }

    /// Import records of `kind` from CSV (`Name, Links, Assignee, Attachment,
    /// Detail, Last modification`). A non-empty `Detail` becomes the
    /// record's description.
    pub async fn import_records_csv(
        &self,
        kind: RecordKind,
        text: &str,
        intent: TagIntent,
    ) -> Result<ImportSummary> {
        let session =
            authorize(self.sessions.as_ref(), CURATOR_ROLES, "import_records_csv").await?;
        let start = Instant::now();
        let mut summary = ImportSummary::default();

        for parsed in csv_record_rows(text) {
            let row = match parsed {
                Parsed::Row(row) => row,
                Parsed::Skip { line, reason } => {
                    trace!(subsystem = "import", line, ?reason, "Row skipped");
                    summary.skipped += 1;
                    continue;
                }
            };
            if row.path.is_empty() {
                summary.record_error(row.line, "Row has no link or attachment URL");
                continue;
            }

            let mut row_intent = intent.clone();
            if !row.description.is_empty() {
                row_intent.description = Change::Set(row.description.clone());
            }

            match self
                .upsert_record(kind, &row.title, &row.path, &row_intent)
                .await
            {
                Ok(outcome) => outcome.tally(&mut summary),
                Err(e) => {
                    warn!(
                        subsystem = "import",
                        component = "records_csv",
                        line = row.line,
                        error = %e,
                        "Row import failed"
                    );
                    summary.record_error(row.line, e.to_string());
                }
            }
        }

        self.finish_record_batch("import_records_csv", &session.user_id, kind, &summary, start)
            .await;
        Ok(summary)
    }

    /// Import uploads from a newline-separated URL list, titling each record
    /// with the page's `og:title`/`<title>`. When a page cannot be fetched
    /// the title is derived from the URL instead.
    pub async fn import_manuals_from_urls(
        &self,
        text: &str,
        intent: TagIntent,
    ) -> Result<ImportSummary> {
        let session = authorize(
            self.sessions.as_ref(),
            CURATOR_ROLES,
            "import_manuals_from_urls",
        )
        .await?;
        let start = Instant::now();
        let mut summary = ImportSummary::default();

        let mut rows = Vec::new();
        for parsed in url_rows(text) {
            match parsed {
                Parsed::Row(row) => rows.push(row),
                Parsed::Skip { .. } => summary.skipped += 1,
            }
        }

        let pages = join_all(rows.iter().map(|row| self.fetcher.fetch(&row.url))).await;

        for (row, page) in rows.iter().zip(pages) {
            let title = match page {
                Ok(html) => scrape_page_title(&html).unwrap_or_else(|| title_from_url(&row.url)),
                Err(e) => {
                    warn!(
                        subsystem = "import",
                        component = "url_list",
                        line = row.line,
                        url = %row.url,
                        error = %e,
                        "Title fetch failed; using URL-derived title"
                    );
                    title_from_url(&row.url)
                }
            };

            match self
                .upsert_record(RecordKind::Upload, &title, &row.url, &intent)
                .await
            {
                Ok(outcome) => outcome.tally(&mut summary),
                Err(e) => summary.record_error(row.line, e.to_string()),
            }
        }

        self.finish_record_batch(
            "import_manuals_from_urls",
            &session.user_id,
            RecordKind::Upload,
            &summary,
            start,
        )
        .await;
        Ok(summary)
    }

    /// Fetch every catalog source concurrently and upsert each linked
    /// document as a "Reference File" upload in the source's scope.
    ///
    /// A failing source is reported in `errors` (line 0) and the rest carry on.
    pub async fn sync_reference_catalog(&self, sources: &[CatalogSource]) -> Result<ImportSummary> {
        let session =
            authorize(self.sessions.as_ref(), CURATOR_ROLES, "sync_reference_catalog").await?;
        let start = Instant::now();
        let mut summary = ImportSummary::default();

        let pages = join_all(sources.iter().map(|s| self.fetcher.fetch(&s.url))).await;

        for (source, page) in sources.iter().zip(pages) {
            let html = match page {
                Ok(html) => html,
                Err(e) => {
                    warn!(
                        subsystem = "import",
                        component = "catalog",
                        url = %source.url,
                        error = %e,
                        "Catalog source failed"
                    );
                    summary.record_error(0, format!("{}: {}", source.url, e));
                    continue;
                }
            };
            let base = match Url::parse(&source.url) {
                Ok(base) => base,
                Err(e) => {
                    summary.record_error(0, format!("{}: {}", source.url, e));
                    continue;
                }
            };

            for link in extract_catalog_links(&html, &base) {
                match self.upsert_reference_file(&link.name, &link.url, source.scope).await {
                    Ok(outcome) => outcome.tally(&mut summary),
                    Err(e) => summary.record_error(0, format!("{}: {}", link.url, e)),
                }
            }
        }

        self.finish_record_batch(
            "sync_reference_catalog",
            &session.user_id,
            RecordKind::Upload,
            &summary,
            start,
        )
        .await;
        Ok(summary)
    }

    /// Mark `url` as a reference file in `scope`, keeping any other
    /// integration group it already had.
    async fn upsert_reference_file(&self, title: &str, url: &str, scope: RefScope) -> Result<Upserted> {
        let mut groups = match self.records.find_by_path(RecordKind::Upload, url).await? {
            Some(existing) => {
                TagSet::parse(&existing.tags, RecordKind::Upload.categories()).integration_groups
            }
            None => Vec::new(),
        };
        if !groups.contains(&IntegrationGroup::ReferenceFile) {
            groups.push(IntegrationGroup::ReferenceFile);
        }
        groups.sort();

        let intent = TagIntent::keep().with_integration(groups).with_scope(scope);
        self.upsert_record(RecordKind::Upload, title, url, &intent)
            .await
    }

    async fn finish_record_batch(
        &self,
        op: &'static str,
        user_id: &str,
        kind: RecordKind,
        summary: &ImportSummary,
        start: Instant,
    ) {
        info!(
            subsystem = "import",
            op,
            user_id,
            record_kind = %kind,
            added = summary.added.len(),
            updated = summary.updated.len(),
            skipped = summary.skipped,
            failed = summary.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch finished"
        );
        if !summary.added.is_empty() || !summary.updated.is_empty() {
            self.revalidate([kind.page_path()]).await;
        }
    }
}
