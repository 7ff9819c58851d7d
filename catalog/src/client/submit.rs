//! The editor submit flow.
//!
//! A submit runs in three steps and stops at the first failure:
//!
//! 1. upload every pending image as one batch, in the order the files were added
//! 2. bind the returned paths to their slots and walk the display order
//! 3. create or update the publication with the resolved image list
//!
//! Nothing is persisted when the upload fails. Files from a batch whose
//! publication write later fails are left in storage.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::{CatalogApi, ClientError, Session};
use crate::api::models::publications::PublicationResponse;
use crate::domain::{Category, Draft, ImageSetEditor, ReconcileError, ResolvedImage, SlotId, Specs, SpecsError};
use crate::types::PublicationId;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a submit is already in progress")]
    AlreadySubmitting,

    #[error("at least one image is required")]
    NoImages,

    #[error(transparent)]
    InvalidSpecs(#[from] SpecsError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    /// Refuse to submit an empty image set
    pub require_images: bool,
}

/// Scalar fields of the editor form.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingForm {
    pub title: String,
    pub price: Decimal,
    /// `None` lets the server apply its default
    pub currency: Option<String>,
    pub description: String,
    pub category: Category,
    pub specs: Value,
}

impl From<Draft> for ListingForm {
    fn from(draft: Draft) -> Self {
        Self {
            title: draft.title,
            price: draft.price,
            currency: Some(draft.currency),
            description: draft.description,
            category: draft.category,
            specs: draft.specs.to_value(),
        }
    }
}

/// Body sent to the create and update endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPayload {
    pub title: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub description: String,
    pub category: Category,
    pub images: Vec<String>,
    pub specs: Value,
}

/// One listing being created or edited.
#[derive(Debug)]
pub struct ListingEditor {
    publication_id: Option<PublicationId>,
    pub form: ListingForm,
    pub images: ImageSetEditor,
    submitting: AtomicBool,
}

impl ListingEditor {
    /// Editor for a new listing.
    pub fn new(form: ListingForm) -> Self {
        Self {
            publication_id: None,
            form,
            images: ImageSetEditor::new(),
            submitting: AtomicBool::new(false),
        }
    }

    /// Editor seeded from a stored publication.
    pub fn edit(publication: &PublicationResponse) -> Self {
        let stored = publication.images.iter().map(|image| ResolvedImage {
            image_path: image.image_path.clone(),
            position: image.position,
            is_cover: image.is_cover,
        });

        Self {
            publication_id: Some(publication.id),
            form: ListingForm {
                title: publication.title.clone(),
                price: publication.price,
                currency: Some(publication.currency.clone()),
                description: publication.description.clone(),
                category: publication.category,
                specs: publication.specs.clone(),
            },
            images: ImageSetEditor::from_stored(stored),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn publication_id(&self) -> Option<PublicationId> {
        self.publication_id
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Upload pending images, resolve the final order and write the listing.
    #[instrument(skip_all, fields(publication_id = ?self.publication_id), err)]
    pub async fn submit<A>(&self, api: &A, session: &Session, options: SubmitOptions) -> Result<PublicationResponse, SubmitError>
    where
        A: CatalogApi + ?Sized,
    {
        if self.submitting.swap(true, Ordering::AcqRel) {
            return Err(SubmitError::AlreadySubmitting);
        }
        let _in_flight = scopeguard::guard((), |_| self.submitting.store(false, Ordering::Release));

        session.bearer()?;
        if options.require_images && self.images.is_empty() {
            return Err(SubmitError::NoImages);
        }
        Specs::validate(self.form.category, &self.form.specs)?;

        let uploaded = self.upload_pending(api, session).await?;
        let images: Vec<String> = self.images.resolve(&uploaded)?.into_iter().map(|image| image.image_path).collect();

        let payload = ListingPayload {
            title: self.form.title.clone(),
            price: self.form.price,
            currency: self.form.currency.clone(),
            description: self.form.description.clone(),
            category: self.form.category,
            images,
            specs: self.form.specs.clone(),
        };

        let publication = match self.publication_id {
            None => api.create_publication(session, &payload).await?,
            Some(id) => api.update_publication(session, id, &payload).await?,
        };

        info!(id = %publication.id, images = publication.images.len(), "Listing submitted");
        Ok(publication)
    }

    async fn upload_pending<A>(&self, api: &A, session: &Session) -> Result<HashMap<SlotId, String>, SubmitError>
    where
        A: CatalogApi + ?Sized,
    {
        let pending = self.images.pending_in_addition_order();
        if pending.is_empty() {
            return Ok(HashMap::new());
        }

        let (slot_ids, files): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
        debug!(count = files.len(), "Uploading pending images");

        let results = api.upload_images(session, &files).await?;
        let paths = results.into_iter().map(|file| file.path).collect();

        Ok(ImageSetEditor::bind_upload_results(&slot_ids, paths)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::publications::PublicationImageResponse;
    use crate::api::models::uploads::UploadedFile;
    use crate::domain::LocalImage;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// In-memory API that records every call.
    #[derive(Default)]
    struct FakeApi {
        uploads: Mutex<Vec<Vec<String>>>,
        writes: Mutex<Vec<(Option<PublicationId>, ListingPayload)>>,
        fail_upload: bool,
        /// Return this many fewer paths than files submitted
        drop_results: usize,
        /// Block uploads until notified
        gate: Option<Notify>,
    }

    impl FakeApi {
        fn uploads(&self) -> Vec<Vec<String>> {
            self.uploads.lock().unwrap().clone()
        }

        fn writes(&self) -> Vec<(Option<PublicationId>, ListingPayload)> {
            self.writes.lock().unwrap().clone()
        }

        fn respond(&self, id: PublicationId, payload: &ListingPayload) -> PublicationResponse {
            PublicationResponse {
                id,
                title: payload.title.clone(),
                price: payload.price,
                currency: payload.currency.clone().unwrap_or_else(|| "USD".to_string()),
                description: payload.description.clone(),
                category: payload.category,
                specs: payload.specs.clone(),
                images: payload
                    .images
                    .iter()
                    .enumerate()
                    .map(|(i, path)| PublicationImageResponse {
                        id: uuid::Uuid::new_v4(),
                        publication_id: id,
                        image_path: path.clone(),
                        is_cover: i == 0,
                        position: i as i32,
                    })
                    .collect(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl CatalogApi for FakeApi {
        async fn upload_images(&self, _session: &Session, files: &[&LocalImage]) -> Result<Vec<UploadedFile>, ClientError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.uploads
                .lock()
                .unwrap()
                .push(files.iter().map(|f| f.file_name.clone()).collect());

            if self.fail_upload {
                return Err(ClientError::Api {
                    status: 500,
                    message: "Failed to store file".to_string(),
                });
            }

            Ok(files
                .iter()
                .take(files.len() - self.drop_results)
                .map(|f| UploadedFile {
                    filename: f.file_name.clone(),
                    path: format!("/uploads/{}", f.file_name),
                    size: f.bytes.len() as u64,
                })
                .collect())
        }

        async fn create_publication(&self, _session: &Session, payload: &ListingPayload) -> Result<PublicationResponse, ClientError> {
            self.writes.lock().unwrap().push((None, payload.clone()));
            Ok(self.respond(uuid::Uuid::new_v4(), payload))
        }

        async fn update_publication(
            &self,
            _session: &Session,
            id: PublicationId,
            payload: &ListingPayload,
        ) -> Result<PublicationResponse, ClientError> {
            self.writes.lock().unwrap().push((Some(id), payload.clone()));
            Ok(self.respond(id, payload))
        }
    }

    fn session() -> Session {
        Session::new("token", Utc::now() + chrono::Duration::hours(1))
    }

    fn file(name: &str) -> LocalImage {
        LocalImage::new(name, "image/jpeg", b"jpeg".to_vec())
    }

    fn vehicle_form() -> ListingForm {
        ListingForm {
            title: "Ford Ranger".to_string(),
            price: Decimal::from(25000),
            currency: None,
            description: String::new(),
            category: Category::Vehiculo,
            specs: json!({"km": 45000, "year": 2020}),
        }
    }

    fn stored_publication(paths: &[&str]) -> PublicationResponse {
        let payload = ListingPayload {
            title: "Ford Ranger".to_string(),
            price: Decimal::from(25000),
            currency: Some("USD".to_string()),
            description: String::new(),
            category: Category::Vehiculo,
            images: paths.iter().map(|p| p.to_string()).collect(),
            specs: json!({"km": 45000, "year": 2020}),
        };
        FakeApi::default().respond(uuid::Uuid::new_v4(), &payload)
    }

    #[tokio::test]
    async fn test_create_uploads_in_addition_order_and_saves_display_order() {
        let api = FakeApi::default();
        let mut editor = ListingEditor::new(vehicle_form());
        editor.images.add_files([file("a.jpg"), file("b.jpg"), file("c.jpg")]);
        // c becomes the cover
        editor.images.move_slot(2, 0).unwrap();

        let created = editor.submit(&api, &session(), SubmitOptions::default()).await.unwrap();

        assert_eq!(api.uploads(), vec![vec!["a.jpg", "b.jpg", "c.jpg"]]);
        let writes = api.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, None);
        assert_eq!(writes[0].1.images, vec!["/uploads/c.jpg", "/uploads/a.jpg", "/uploads/b.jpg"]);
        assert!(created.images[0].is_cover);
        assert!(!editor.is_submitting());
    }

    #[tokio::test]
    async fn test_unchanged_edit_skips_upload_and_keeps_images() {
        let api = FakeApi::default();
        let stored = stored_publication(&["/uploads/1.jpg", "/uploads/2.jpg"]);
        let editor = ListingEditor::edit(&stored);
        assert!(editor.images.is_unchanged());

        editor.submit(&api, &session(), SubmitOptions::default()).await.unwrap();

        assert!(api.uploads().is_empty());
        let writes = api.writes();
        assert_eq!(writes[0].0, Some(stored.id));
        assert_eq!(writes[0].1.images, vec!["/uploads/1.jpg", "/uploads/2.jpg"]);
    }

    #[tokio::test]
    async fn test_edit_mixes_existing_and_new_images() {
        let api = FakeApi::default();
        let stored = stored_publication(&["/uploads/1.jpg", "/uploads/2.jpg"]);
        let mut editor = ListingEditor::edit(&stored);

        let first_stored = editor.images.slots()[0].slot_id;
        editor.images.remove(first_stored).unwrap();
        editor.images.add_files([file("new.jpg")]);
        editor.images.move_slot(1, 0).unwrap();

        editor.submit(&api, &session(), SubmitOptions::default()).await.unwrap();

        assert_eq!(api.uploads(), vec![vec!["new.jpg"]]);
        assert_eq!(api.writes()[0].1.images, vec!["/uploads/new.jpg", "/uploads/2.jpg"]);
    }

    #[tokio::test]
    async fn test_failed_upload_persists_nothing() {
        let api = FakeApi {
            fail_upload: true,
            ..Default::default()
        };
        let mut editor = ListingEditor::new(vehicle_form());
        editor.images.add_files([file("a.jpg")]);

        let err = editor.submit(&api, &session(), SubmitOptions::default()).await.unwrap_err();

        assert!(matches!(err, SubmitError::Client(ClientError::Api { status: 500, .. })));
        assert!(api.writes().is_empty());
        assert!(!editor.is_submitting());
    }

    #[tokio::test]
    async fn test_short_upload_result_fails_instead_of_dropping_images() {
        let api = FakeApi {
            drop_results: 1,
            ..Default::default()
        };
        let mut editor = ListingEditor::new(vehicle_form());
        editor.images.add_files([file("a.jpg"), file("b.jpg")]);

        let err = editor.submit(&api, &session(), SubmitOptions::default()).await.unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Reconcile(ReconcileError::UploadCountMismatch { submitted: 2, returned: 1 })
        ));
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_checks_run_before_upload() {
        let api = FakeApi::default();

        let mut no_images = ListingEditor::new(vehicle_form());
        let options = SubmitOptions { require_images: true };
        assert!(matches!(no_images.submit(&api, &session(), options).await, Err(SubmitError::NoImages)));

        no_images.form.specs = json!({"year": 2020});
        no_images.images.add_files([file("a.jpg")]);
        let err = no_images.submit(&api, &session(), options).await.unwrap_err();
        assert!(matches!(err, SubmitError::InvalidSpecs(SpecsError::MissingField { field: "km", .. })));

        let expired = Session::new("token", Utc::now() - chrono::Duration::seconds(1));
        let err = no_images.submit(&api, &expired, options).await.unwrap_err();
        assert!(matches!(err, SubmitError::Client(ClientError::SessionExpired(_))));

        assert!(api.uploads().is_empty());
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_uploading_is_refused() {
        let api = FakeApi {
            gate: Some(Notify::new()),
            ..Default::default()
        };
        let mut editor = ListingEditor::new(vehicle_form());
        editor.images.add_files([file("a.jpg")]);
        let session = session();

        let (first, second) = tokio::join!(editor.submit(&api, &session, SubmitOptions::default()), async {
            let result = editor.submit(&api, &session, SubmitOptions::default()).await;
            if let Some(gate) = &api.gate {
                gate.notify_one();
            }
            result
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(SubmitError::AlreadySubmitting)));
        assert_eq!(api.uploads().len(), 1);
        assert!(!editor.is_submitting());
    }

    #[test]
    fn test_form_from_draft() {
        let draft = crate::domain::parser::parse("Tractor John Deere\n1500 hs\n2015");
        let form = ListingForm::from(draft);
        assert_eq!(form.category, Category::Maquinaria);
        assert_eq!(form.specs, json!({"horas": 1500, "year": 2015}));
        assert_eq!(form.currency.as_deref(), Some("USD"));
    }
}
