//! Image file storage.
//!
//! Uploaded images are written under a base directory and addressed by an
//! opaque path token (`/uploads/<stored-name>` by default). The token is what
//! gets persisted in `publication_images.image_path`; serving the files is
//! left to whatever fronts the upload directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path '{0}' does not belong to this storage")]
    ForeignPath(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Where a stored file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated file name, unique per upload
    pub filename: String,
    /// Path token to persist and hand back to clients
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

/// Trait for image storage backends
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store file content under a fresh name derived from `original_name`
    async fn store(&self, original_name: &str, content: &[u8]) -> Result<StoredFile>;

    /// Delete a previously stored file by its path token. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Local filesystem storage backend
#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    base_dir: PathBuf,
    public_prefix: String,
}

impl LocalImageStorage {
    pub fn new(base_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a path token back onto the base directory, refusing anything that
    /// is not a plain file name under our prefix.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let name = path
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::ForeignPath(path.to_string()))?;

        if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(StorageError::ForeignPath(path.to_string()));
        }

        Ok(self.base_dir.join(name))
    }
}

/// `<stem>-<uuid><.ext>`, with the stem reduced to filename-safe characters.
pub fn unique_file_name(original_name: &str) -> String {
    let original = Path::new(original_name);
    let stem: String = original
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "image".to_string() } else { stem };

    let extension = original
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{stem}-{}.{ext}", uuid::Uuid::new_v4()),
        None => format!("{stem}-{}", uuid::Uuid::new_v4()),
    }
}

async fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let result = async {
        let mut file = fs::File::create(path).await?;
        file.write_all(content).await?;
        file.sync_all().await
    }
    .await;

    discard_on_error(path, result).await
}

/// A failed write leaves no partial file behind. The caller never learns its
/// name, so batch cleanup could not find it.
async fn discard_on_error(path: &Path, result: std::io::Result<()>) -> std::io::Result<()> {
    if result.is_err() {
        let _ = fs::remove_file(path).await;
    }
    result
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store(&self, original_name: &str, content: &[u8]) -> Result<StoredFile> {
        fs::create_dir_all(&self.base_dir).await?;

        let filename = unique_file_name(original_name);
        let full_path = self.base_dir.join(&filename);

        write_file(&full_path, content).await?;

        Ok(StoredFile {
            path: format!("{}/{}", self.public_prefix, filename),
            filename,
            size: content.len() as u64,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
