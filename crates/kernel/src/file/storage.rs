//! File storage backends.
//!
//! Uploaded feature images are written under a base directory and referenced
//! from posts by `local://` URI.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Maximum feature image size (10 MiB).
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted as feature images.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// File storage backend trait.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write data to storage at the given URI.
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()>;

    /// Delete a file from storage. Missing files are not an error.
    async fn delete(&self, uri: &str) -> Result<()>;

    /// Get the public URL for a file.
    fn public_url(&self, uri: &str) -> String;

    /// Generate a fresh storage URI for an uploaded file name.
    fn generate_uri(&self, filename: &str) -> String;
}

/// Local filesystem storage.
pub struct LocalFileStorage {
    /// Base path for file storage.
    base_path: PathBuf,
    /// Base URL for public file access.
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Parse a local:// URI to get the filesystem path.
    ///
    /// Rejects paths containing `..` components.
    fn parse_uri(&self, uri: &str) -> Result<PathBuf> {
        let path = uri
            .strip_prefix("local://")
            .context("invalid local URI, must start with local://")?;
        for component in Path::new(path).components() {
            if matches!(component, Component::ParentDir | Component::RootDir) {
                anyhow::bail!("directory traversal not allowed in storage URI");
            }
        }
        Ok(self.base_path.join(path))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()> {
        let path = self.parse_uri(uri)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("failed to create directories")?;
        }

        let mut file = fs::File::create(&path)
            .await
            .context("failed to create file")?;
        file.write_all(data).await.context("failed to write file")?;
        file.flush().await.context("failed to flush file")?;

        debug!(uri = %uri, path = ?path, size = data.len(), "file written");
        Ok(())
    }

    async fn delete(&self, uri: &str) -> Result<()> {
        let path = self.parse_uri(uri)?;

        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path)
                .await
                .context("failed to delete file")?;
            debug!(uri = %uri, "file deleted");
        } else {
            warn!(uri = %uri, "file not found for deletion");
        }

        Ok(())
    }

    fn public_url(&self, uri: &str) -> String {
        let path = uri.strip_prefix("local://").unwrap_or(uri);
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn generate_uri(&self, filename: &str) -> String {
        let now = chrono::Utc::now();
        let unique_id = uuid::Uuid::now_v7().simple().to_string();

        format!(
            "local://{}/{}/{}_{}",
            now.format("%Y"),
            now.format("%m"),
            &unique_id[..8],
            sanitize_filename(filename)
        )
    }
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Reduce an uploaded file name to a safe basename.
pub fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let safe: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(200)
        .collect();

    if safe.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        safe
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalFileStorage, PathBuf) {
        let dir = std::env::temp_dir().join(format!("scriba-files-{}", uuid::Uuid::now_v7()));
        (LocalFileStorage::new(&dir, "/media"), dir)
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[test]
    fn generated_uri_is_local_and_dated() {
        let (storage, _) = temp_storage();
        let uri = storage.generate_uri("cover.jpg");
        assert!(uri.starts_with("local://"));
        assert!(uri.ends_with("_cover.jpg"));
        assert_eq!(uri.matches('/').count(), 4);
    }

    #[test]
    fn traversal_is_rejected() {
        let (storage, _) = temp_storage();
        assert!(storage.parse_uri("local://../secret").is_err());
        assert!(storage.parse_uri("s3://bucket/key").is_err());
    }

    #[test]
    fn public_url_joins_base() {
        let (storage, _) = temp_storage();
        assert_eq!(
            storage.public_url("local://2026/01/abc_cover.jpg"),
            "/media/2026/01/abc_cover.jpg"
        );
    }

    #[tokio::test]
    async fn write_then_delete() {
        let (storage, dir) = temp_storage();
        let uri = storage.generate_uri("a.png");

        storage.write(&uri, b"png-bytes").await.unwrap();
        let path = storage.parse_uri(&uri).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");

        storage.delete(&uri).await.unwrap();
        assert!(!path.exists());

        // Deleting again is a no-op.
        storage.delete(&uri).await.unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }
}
