//! Ordered image sets.
//!
//! An editor session starts from the images already stored for a listing and
//! lets the user add local files, reorder and remove. Each entry gets a
//! [`SlotId`] when it enters the editor, and that id follows it through every
//! move. On submit the pending files are uploaded in the order they were
//! added, the upload results are bound back to their slot ids, and the
//! display order is walked to produce the final list.
//!
//! The final list always satisfies: `position == index` and
//! `is_cover == (index == 0)`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use utoipa::ToSchema;

/// Stable identity of one entry in an [`ImageSetEditor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// A file picked on the editor side that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl LocalImage {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = mime_guess::from_path(path).first_or_octet_stream().to_string();

        Ok(Self::new(file_name, content_type, bytes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotOrigin {
    /// Already stored, identified by its path token
    Existing(String),
    /// Selected locally, waiting for upload
    Pending(LocalImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlot {
    pub slot_id: SlotId,
    pub origin: SlotOrigin,
}

/// One entry of a final, ordered image list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedImage {
    pub image_path: String,
    pub position: i32,
    pub is_cover: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("upload returned {returned} paths for {submitted} files")]
    UploadCountMismatch { submitted: usize, returned: usize },

    #[error("upload returned an empty path for {0}")]
    EmptyPath(SlotId),

    #[error("no uploaded path for {0}")]
    UnresolvedSlot(SlotId),

    #[error("position {index} is out of range for {len} images")]
    OutOfRange { index: usize, len: usize },
}

/// Number an ordered list of paths: position is the index, the first one is the cover.
pub fn assign_positions<I, S>(paths: I) -> Vec<ResolvedImage>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| ResolvedImage {
            image_path: path.into(),
            position: index as i32,
            is_cover: index == 0,
        })
        .collect()
}

/// Walk `slots` in display order and turn each one into a stored path.
///
/// Existing slots keep their path. Pending slots must have an entry in
/// `uploaded`, otherwise the whole resolution fails.
pub fn resolve(slots: &[ImageSlot], uploaded: &HashMap<SlotId, String>) -> Result<Vec<ResolvedImage>, ReconcileError> {
    let paths = slots
        .iter()
        .map(|slot| match &slot.origin {
            SlotOrigin::Existing(path) => Ok(path.clone()),
            SlotOrigin::Pending(_) => uploaded
                .get(&slot.slot_id)
                .cloned()
                .ok_or(ReconcileError::UnresolvedSlot(slot.slot_id)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(assign_positions(paths))
}

/// Editor-side state of a listing's image set.
#[derive(Debug, Clone, Default)]
pub struct ImageSetEditor {
    /// Display order
    slots: Vec<ImageSlot>,
    /// Pending slots in the order they were added
    added: Vec<SlotId>,
    /// Stored paths the editor was opened with
    baseline: Vec<String>,
    next_id: u64,
}

impl ImageSetEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted images, ordered by their stored position.
    pub fn from_stored(images: impl IntoIterator<Item = ResolvedImage>) -> Self {
        let mut stored: Vec<ResolvedImage> = images.into_iter().collect();
        stored.sort_by_key(|image| image.position);

        let mut editor = Self::new();
        for image in stored {
            let slot_id = editor.next_slot_id();
            editor.baseline.push(image.image_path.clone());
            editor.slots.push(ImageSlot {
                slot_id,
                origin: SlotOrigin::Existing(image.image_path),
            });
        }
        editor
    }

    fn next_slot_id(&mut self) -> SlotId {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append files after the current images. Returns their new slot ids in order.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = LocalImage>) -> Vec<SlotId> {
        files
            .into_iter()
            .map(|file| {
                let slot_id = self.next_slot_id();
                self.slots.push(ImageSlot {
                    slot_id,
                    origin: SlotOrigin::Pending(file),
                });
                self.added.push(slot_id);
                slot_id
            })
            .collect()
    }

    /// Move the entry at display index `from` to display index `to`.
    pub fn move_slot(&mut self, from: usize, to: usize) -> Result<(), ReconcileError> {
        let len = self.slots.len();
        for index in [from, to] {
            if index >= len {
                return Err(ReconcileError::OutOfRange { index, len });
            }
        }

        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
        Ok(())
    }

    pub fn remove(&mut self, slot_id: SlotId) -> Option<ImageSlot> {
        let index = self.slots.iter().position(|slot| slot.slot_id == slot_id)?;
        self.added.retain(|id| *id != slot_id);
        Some(self.slots.remove(index))
    }

    pub fn slots(&self) -> &[ImageSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.added.is_empty()
    }

    /// Pending files in the order the user selected them, which is the order they get uploaded in.
    pub fn pending_in_addition_order(&self) -> Vec<(SlotId, &LocalImage)> {
        self.added
            .iter()
            .filter_map(|id| {
                self.slots.iter().find(|slot| slot.slot_id == *id).and_then(|slot| match &slot.origin {
                    SlotOrigin::Pending(file) => Some((*id, file)),
                    SlotOrigin::Existing(_) => None,
                })
            })
            .collect()
    }

    /// True when nothing was added and the stored images are in their original order.
    pub fn is_unchanged(&self) -> bool {
        !self.has_pending()
            && self.slots.len() == self.baseline.len()
            && self.slots.iter().zip(&self.baseline).all(|(slot, path)| match &slot.origin {
                SlotOrigin::Existing(existing) => existing == path,
                SlotOrigin::Pending(_) => false,
            })
    }

    /// Pair submitted slot ids with the upload results, which come back in submission order.
    pub fn bind_upload_results(submitted: &[SlotId], results: Vec<String>) -> Result<HashMap<SlotId, String>, ReconcileError> {
        if submitted.len() != results.len() {
            return Err(ReconcileError::UploadCountMismatch {
                submitted: submitted.len(),
                returned: results.len(),
            });
        }

        submitted
            .iter()
            .zip(results)
            .map(|(slot_id, path)| {
                if path.trim().is_empty() {
                    Err(ReconcileError::EmptyPath(*slot_id))
                } else {
                    Ok((*slot_id, path))
                }
            })
            .collect()
    }

    pub fn resolve(&self, uploaded: &HashMap<SlotId, String>) -> Result<Vec<ResolvedImage>, ReconcileError> {
        resolve(&self.slots, uploaded)
    }
}
