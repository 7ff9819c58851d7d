//! API request/response models for publications.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::db::models::publications::{PublicationDBResponse, PublicationImageDBResponse};
use crate::domain::Category;
use crate::types::{PublicationId, PublicationImageId};

/// Request body for creating a publication.
///
/// `title`, `price` and `category` are required; they are optional here so a
/// missing one produces a readable 400 rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PublicationCreate {
    pub title: Option<String>,
    /// Non-negative amount, as a JSON number or numeric string
    #[schema(value_type = Option<String>, example = "25000")]
    pub price: Option<Decimal>,
    /// Currency code, defaults to the configured listing currency
    pub currency: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    /// Final ordered list of image path tokens; the first becomes the cover
    #[serde(default)]
    pub images: Vec<String>,
    /// Category-specific attributes
    #[schema(value_type = Option<Object>)]
    pub specs: Option<Value>,
}

/// Request body for updating a publication. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PublicationUpdate {
    pub title: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub description: Option<String>,
    /// Must match the stored category when given
    pub category: Option<Category>,
    /// Replaces the stored image list; `[]` removes every image
    pub images: Option<Vec<String>>,
    /// Replaces the stored specs
    #[schema(value_type = Option<Object>)]
    pub specs: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPublicationsQuery {
    /// Only return publications of this category
    pub category: Option<Category>,
    /// Number of items to skip
    #[param(default = 0, minimum = 0)]
    pub skip: Option<i64>,
    /// Maximum number of items to return
    #[param(minimum = 1, maximum = 1000)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicationImageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PublicationImageId,
    #[schema(value_type = String, format = "uuid")]
    pub publication_id: PublicationId,
    pub image_path: String,
    pub is_cover: bool,
    pub position: i32,
}

impl From<PublicationImageDBResponse> for PublicationImageResponse {
    fn from(db: PublicationImageDBResponse) -> Self {
        Self {
            id: db.id,
            publication_id: db.publication_id,
            image_path: db.image_path,
            is_cover: db.is_cover,
            position: db.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PublicationId,
    pub title: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub currency: String,
    pub description: String,
    pub category: Category,
    #[schema(value_type = Object)]
    pub specs: Value,
    /// Ordered by position, cover first
    pub images: Vec<PublicationImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PublicationDBResponse> for PublicationResponse {
    fn from(db: PublicationDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            price: db.price,
            currency: db.currency,
            description: db.description,
            category: db.category,
            specs: db.specs,
            images: db.images.into_iter().map(Into::into).collect(),
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Envelope returned by create and update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicationEnvelope {
    pub success: bool,
    pub message: String,
    pub data: PublicationResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}
