//! Upload persistence.
//!
//! Two [`FileStore`] backends: files on disk served under a public URL
//! prefix, or `data:` URIs stored inline in the record path.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use waypoint_core::{guess_mime_type, sanitize_filename, Error, FileStore, Result};

/// Stores uploads under a directory and returns `{url_prefix}/{name}`.
///
/// Stored names are `{uuid}-{sanitized original}` so repeated uploads of the
/// same file never collide.
pub struct DiskFileStore {
    root: PathBuf,
    url_prefix: String,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Round-trip a small file to catch permission or mount problems at startup.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let probe = self.root.join(".health-check");

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.root, e))?;
        fs::write(&probe, b"uploads-health-check")
            .await
            .map_err(|e| format!("write({:?}): {}", probe, e))?;
        let read_back = fs::read(&probe)
            .await
            .map_err(|e| format!("read({:?}): {}", probe, e))?;
        if read_back != b"uploads-health-check" {
            return Err("read-back mismatch".to_string());
        }
        fs::remove_file(&probe)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", probe, e))?;
        Ok(())
    }

    async fn write_atomic(&self, name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.root.join(name);
        fs::create_dir_all(&self.root).await.map_err(|e| {
            warn!(subsystem = "storage", root = %self.root.display(), error = %e, "create_dir_all failed");
            e
        })?;

        let temp_path = self.root.join(format!(".{}.tmp", name));
        if let Err(e) = write_then_rename(&temp_path, &full_path, data).await {
            warn!(
                subsystem = "storage",
                from = %temp_path.display(),
                to = %full_path.display(),
                error = %e,
                "atomic write failed"
            );
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(subsystem = "storage", path = %temp_path.display(), error = %cleanup, "temp file cleanup failed");
                }
            }
            return Err(e.into());
        }

        // rw-r--r--, never executable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }
        Ok(())
    }
}

async fn write_then_rename(
    temp_path: &std::path::Path,
    full_path: &std::path::Path,
    data: &[u8],
) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, full_path).await
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn persist(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        let name = format!(
            "{}-{}",
            Uuid::now_v7().simple(),
            sanitize_filename(suggested_name)
        );
        self.write_atomic(&name, bytes)
            .await
            .map_err(|e| Error::Storage(format!("Failed to store {}: {}", suggested_name, e)))?;

        debug!(
            subsystem = "storage",
            component = "disk",
            stored_name = %name,
            size = bytes.len(),
            "Upload persisted"
        );
        Ok(format!("{}/{}", self.url_prefix.trim_end_matches('/'), name))
    }
}

/// Encodes uploads as `data:{mime};base64,...` URIs.
///
/// For deployments without a writable uploads directory.
#[derive(Default)]
pub struct DataUriFileStore;

#[async_trait]
impl FileStore for DataUriFileStore {
    async fn persist(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        let mime = guess_mime_type(suggested_name, bytes);
        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disk_store_writes_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), "/uploads/");

        let url = store.persist(b"%PDF-1.7", "Safety Manual.pdf").await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with("-Safety-Manual.pdf"));

        let name = url.trim_start_matches("/uploads/");
        let stored = tokio::fs::read(dir.path().join(name)).await.unwrap();
        assert_eq!(stored, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target name makes the rename fail.
        std::fs::create_dir(dir.path().join("taken.pdf")).unwrap();
        std::fs::write(dir.path().join("taken.pdf").join("inner"), b"x").unwrap();
        let store = DiskFileStore::new(dir.path(), "/uploads");

        assert!(store.write_atomic("taken.pdf", b"%PDF").await.is_err());
        assert!(!dir.path().join(".taken.pdf.tmp").exists());

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["taken.pdf"]);
    }

    #[tokio::test]
    async fn test_disk_store_same_name_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), "/uploads");
        let a = store.persist(b"one", "a.txt").await.unwrap();
        let b = store.persist(b"two", "a.txt").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_disk_store_validate() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path().join("nested"), "/uploads");
        assert!(store.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_data_uri_store() {
        let uri = DataUriFileStore.persist(b"hello", "notes.txt").await.unwrap();
        assert_eq!(uri, "data:text/plain;base64,aGVsbG8=");
    }
}
