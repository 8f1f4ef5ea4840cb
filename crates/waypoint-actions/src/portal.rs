//! The action entry point and its collaborators.

use std::sync::Arc;

use tracing::info;

use waypoint_core::defaults;
use waypoint_core::{
    FileStore, InviteRepository, LearningRepository, PageCache, PageFetcher, RecordRepository,
    SessionProvider,
};
use waypoint_db::{log_pool_metrics, DataUriFileStore, Database, DiskFileStore, PoolConfig};

use crate::config::{PortalConfig, StorageMode};
use crate::fetch::HttpFetcher;

/// External collaborators an action may call.
#[derive(Clone)]
pub struct Collaborators {
    pub records: Arc<dyn RecordRepository>,
    pub learning: Arc<dyn LearningRepository>,
    pub invites: Arc<dyn InviteRepository>,
    pub sessions: Arc<dyn SessionProvider>,
    pub files: Arc<dyn FileStore>,
    pub cache: Arc<dyn PageCache>,
    pub fetcher: Arc<dyn PageFetcher>,
}

/// Limits applied by actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalSettings {
    pub max_upload_bytes: u64,
    pub invite_ttl_hours: i64,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            invite_ttl_hours: defaults::INVITE_TTL_HOURS,
        }
    }
}

impl From<&PortalConfig> for PortalSettings {
    fn from(config: &PortalConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            invite_ttl_hours: config.invite_ttl_hours,
        }
    }
}

/// Server actions over the portal's records, onboarding plan and invites.
///
/// Every mutating action authorizes the caller before its first store call.
#[derive(Clone)]
pub struct Portal {
    pub(crate) records: Arc<dyn RecordRepository>,
    pub(crate) learning: Arc<dyn LearningRepository>,
    pub(crate) invites: Arc<dyn InviteRepository>,
    pub(crate) sessions: Arc<dyn SessionProvider>,
    pub(crate) files: Arc<dyn FileStore>,
    pub(crate) cache: Arc<dyn PageCache>,
    pub(crate) fetcher: Arc<dyn PageFetcher>,
    pub(crate) settings: PortalSettings,
}

impl Portal {
    pub fn new(parts: Collaborators, settings: PortalSettings) -> Self {
        Self {
            records: parts.records,
            learning: parts.learning,
            invites: parts.invites,
            sessions: parts.sessions,
            files: parts.files,
            cache: parts.cache,
            fetcher: parts.fetcher,
            settings,
        }
    }

    /// Wire the portal from the environment: connect, migrate, probe the
    /// schema, and pick the upload backend.
    ///
    /// Sessions and page caching belong to the embedding application.
    pub async fn from_env(
        sessions: Arc<dyn SessionProvider>,
        cache: Arc<dyn PageCache>,
    ) -> anyhow::Result<Self> {
        let config = PortalConfig::from_env()?;
        Self::from_config(&config, sessions, cache).await
    }

    pub async fn from_config(
        config: &PortalConfig,
        sessions: Arc<dyn SessionProvider>,
        cache: Arc<dyn PageCache>,
    ) -> anyhow::Result<Self> {
        let pool_config = PoolConfig::new().max_connections(config.db_max_connections);
        let mut db = Database::connect_with_config(&config.database_url, pool_config).await?;
        db.migrate().await?;
        log_pool_metrics(db.pool());

        let files: Arc<dyn FileStore> = match config.storage_mode {
            StorageMode::Disk => {
                let disk = DiskFileStore::new(&config.uploads_dir, &config.uploads_url_prefix);
                disk.validate()
                    .await
                    .map_err(|e| anyhow::anyhow!("Uploads directory unusable: {}", e))?;
                Arc::new(disk)
            }
            StorageMode::DataUri => Arc::new(DataUriFileStore),
        };

        info!(
            subsystem = "actions",
            component = "portal",
            storage_mode = ?config.storage_mode,
            task_attachments = db.capabilities.task_attachments,
            invite_email = db.capabilities.invite_email,
            "Portal ready"
        );

        let parts = Collaborators {
            records: Arc::new(db.records.clone()),
            learning: Arc::new(db.learning.clone()),
            invites: Arc::new(db.invites.clone()),
            sessions,
            files,
            cache,
            fetcher: Arc::new(HttpFetcher::new(config.fetch_timeout)?),
        };
        Ok(Self::new(parts, PortalSettings::from(config)))
    }

    /// Invalidate every page in `paths`.
    pub(crate) async fn revalidate<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.cache.revalidate(path.as_ref()).await;
        }
    }
}

/// Page showing one learning path.
pub fn onboarding_page(slug: &str) -> String {
    format!("{}/{}", defaults::ONBOARDING_PAGE, slug)
}
