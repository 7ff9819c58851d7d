//! Editor-side client for the catalog API.
//!
//! [`CatalogApi`] is the seam between the submit flow in [`submit`] and the
//! network; [`http::CatalogClient`] is the `reqwest` implementation. Every
//! protected call takes an explicit [`Session`], which is checked for expiry
//! before anything is sent.

pub mod http;
pub mod submit;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use thiserror::Error;

use crate::api::models::publications::PublicationResponse;
use crate::api::models::uploads::UploadedFile;
use crate::auth::session::SessionClaims;
use crate::domain::LocalImage;
use crate::types::PublicationId;

pub use http::CatalogClient;
pub use submit::{ListingEditor, ListingForm, ListingPayload, SubmitError, SubmitOptions};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session expired at {0}")]
    SessionExpired(DateTime<Utc>),

    #[error("session token could not be read: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// A bearer token together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Build a session from a token issued by the login service, reading the
    /// expiry from its `exp` claim. The signature is not checked here; the
    /// server does that on every request.
    pub fn from_token(token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into();

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let claims = jsonwebtoken::decode::<SessionClaims>(&token, &DecodingKey::from_secret(&[]), &validation)?.claims;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken))?;

        Ok(Self::new(token, expires_at))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// The token, if the session is still valid.
    pub fn bearer(&self) -> Result<&str, ClientError> {
        if self.is_expired() {
            return Err(ClientError::SessionExpired(self.expires_at));
        }
        Ok(&self.token)
    }
}

/// Calls the submit flow needs from the catalog API.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Upload one batch. Results come back in the order the files were given.
    async fn upload_images(&self, session: &Session, files: &[&LocalImage]) -> Result<Vec<UploadedFile>, ClientError>;

    async fn create_publication(&self, session: &Session, payload: &ListingPayload) -> Result<PublicationResponse, ClientError>;

    async fn update_publication(
        &self,
        session: &Session,
        id: PublicationId,
        payload: &ListingPayload,
    ) -> Result<PublicationResponse, ClientError>;
}
