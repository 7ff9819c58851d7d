//! Database models for publications and their images.

use crate::domain::{Category, Specs};
use crate::types::{PublicationId, PublicationImageId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

/// Insert request. Specs are already validated against `category`.
#[derive(Debug, Clone)]
pub struct PublicationCreateDBRequest {
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub description: String,
    pub category: Category,
    pub specs: Specs,
    /// Image path tokens in display order; the first one becomes the cover
    pub images: Vec<String>,
}

/// Replace-by-merge update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PublicationUpdateDBRequest {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    /// Replaces the stored specs wholesale
    pub specs: Option<Specs>,
    /// Replaces the stored image set wholesale, in display order; an empty list clears it
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicationImageDBResponse {
    pub id: PublicationImageId,
    pub publication_id: PublicationId,
    pub image_path: String,
    pub is_cover: bool,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct PublicationDBResponse {
    pub id: PublicationId,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub description: String,
    pub category: Category,
    /// Stored specs object, as written by the last successful create or update
    pub specs: Value,
    /// Ordered by position
    pub images: Vec<PublicationImageDBResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublicationDBResponse {
    pub fn image_paths(&self) -> Vec<&str> {
        self.images.iter().map(|image| image.image_path.as_str()).collect()
    }
}
