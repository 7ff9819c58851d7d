//! HTTP handler for image batch uploads.

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    AppState,
    api::models::uploads::UploadResponse,
    auth::current_user::CurrentUser,
    errors::{Error, Result},
    storage::StoredFile,
    types::abbrev_uuid,
};

/// Multipart field that carries the files
pub const IMAGES_FIELD: &str = "images";

/// Upload a batch of images.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    summary = "Upload images",
    description = "Upload a batch of images in the `images` field. Returns one descriptor per file in the order \
                   they were sent. The batch is all-or-nothing: if any file is rejected, files already written \
                   for this request are removed.",
    request_body(
        content_type = "multipart/form-data",
        description = "One or more `images` parts",
    ),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files, too many files or malformed multipart body"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "A file exceeds the size cap"),
        (status = 415, description = "A file type is not allowed"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[instrument(skip_all, fields(user = %abbrev_uuid(&current_user.id)))]
pub async fn upload_images(State(state): State<AppState>, current_user: CurrentUser, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let mut stored = Vec::new();

    if let Err(e) = receive_batch(&state, &mut multipart, &mut stored).await {
        for file in &stored {
            if let Err(cleanup_err) = state.storage.delete(&file.path).await {
                warn!(path = %file.path, error = %cleanup_err, "Failed to remove file from rejected batch");
            }
        }
        return Err(e);
    }

    info!(count = stored.len(), "Images uploaded");

    Ok(Json(UploadResponse {
        success: true,
        message: format!("{} file(s) uploaded", stored.len()),
        files: stored.into_iter().map(Into::into).collect(),
    }))
}

/// Store every `images` part in order, pushing each stored file as it lands
/// so the caller can undo a partial batch.
async fn receive_batch(state: &AppState, multipart: &mut Multipart, stored: &mut Vec<StoredFile>) -> Result<()> {
    let uploads = &state.config.uploads;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        if field.name() != Some(IMAGES_FIELD) {
            debug!(field = ?field.name(), "Ignoring unexpected multipart field");
            continue;
        }

        if stored.len() >= uploads.max_files {
            return Err(Error::bad_request(format!("At most {} files can be uploaded at once", uploads.max_files)));
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());

        if !uploads.allowed_mime_types.iter().any(|allowed| allowed.eq_ignore_ascii_case(&content_type)) {
            return Err(Error::UnsupportedMediaType { content_type });
        }

        let mut content = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
            message: format!("Failed to read file chunk: {e}"),
        })? {
            if (content.len() + chunk.len()) as u64 > uploads.max_file_size {
                return Err(Error::PayloadTooLarge {
                    filename,
                    max_bytes: uploads.max_file_size,
                });
            }
            content.extend_from_slice(&chunk);
        }

        if content.is_empty() {
            return Err(Error::bad_request(format!("File '{filename}' is empty")));
        }

        let file = state.storage.store(&filename, &content).await?;
        debug!(filename = %file.filename, size = file.size, "Stored image");
        stored.push(file);
    }

    if stored.is_empty() {
        return Err(Error::bad_request(format!("No files received in the '{IMAGES_FIELD}' field")));
    }

    Ok(())
}
