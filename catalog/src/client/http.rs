//! `reqwest` implementation of [`CatalogApi`].

use async_trait::async_trait;
use reqwest::{Client, Response, multipart};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{CatalogApi, ClientError, ListingPayload, Session};
use crate::api::handlers::uploads::IMAGES_FIELD;
use crate::api::models::publications::{PublicationEnvelope, PublicationResponse};
use crate::api::models::uploads::{UploadResponse, UploadedFile};
use crate::domain::LocalImage;
use crate::types::{PublicationId, abbrev_uuid};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct CatalogClient {
    client: Client,
    base_url: Url,
}

impl CatalogClient {
    /// Client for the service at `base_url` (the part before `/api`).
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        crate::install_crypto_provider();
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap a prebuilt client. Building it needs a rustls crypto provider,
    /// see [`crate::install_crypto_provider`].
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url: ensure_slash(&base_url),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing
/// the last path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// Decode a success body, or turn an error response into [`ClientError::Api`]
/// carrying the server's `error` message when there is one.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CatalogApi for CatalogClient {
    #[instrument(skip_all, fields(count = files.len()), err)]
    async fn upload_images(&self, session: &Session, files: &[&LocalImage]) -> Result<Vec<UploadedFile>, ClientError> {
        let token = session.bearer()?;

        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes.to_vec())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)?;
            form = form.part(IMAGES_FIELD, part);
        }

        let response = self
            .client
            .post(self.endpoint("api/upload")?)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = decode(response).await?;
        debug!(stored = body.files.len(), "Upload batch accepted");
        Ok(body.files)
    }

    #[instrument(skip_all, err)]
    async fn create_publication(&self, session: &Session, payload: &ListingPayload) -> Result<PublicationResponse, ClientError> {
        let token = session.bearer()?;

        let response = self
            .client
            .post(self.endpoint("api/publications")?)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let envelope: PublicationEnvelope = decode(response).await?;
        Ok(envelope.data)
    }

    #[instrument(skip_all, fields(id = %abbrev_uuid(&id)), err)]
    async fn update_publication(
        &self,
        session: &Session,
        id: PublicationId,
        payload: &ListingPayload,
    ) -> Result<PublicationResponse, ClientError> {
        let token = session.bearer()?;

        let response = self
            .client
            .put(self.endpoint(&format!("api/publications/{id}"))?)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let envelope: PublicationEnvelope = decode(response).await?;
        Ok(envelope.data)
    }
}
