//! API response models for image uploads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::StoredFile;

/// One stored file, in the position it was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Generated file name
    pub filename: String,
    /// Path token to put in a publication's `images` list
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

impl From<StoredFile> for UploadedFile {
    fn from(file: StoredFile) -> Self {
        Self {
            filename: file.filename,
            path: file.path,
            size: file.size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    /// Same order as the submitted files
    pub files: Vec<UploadedFile>,
}
