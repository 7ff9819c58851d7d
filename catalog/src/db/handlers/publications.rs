//! Database repository for publications and their ordered images.
//!
//! Image rows are always written from an ordered list of paths, so position
//! and cover flag are derived here and never taken from the caller.

use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::Repository;
use crate::db::models::publications::{
    PublicationCreateDBRequest, PublicationDBResponse, PublicationImageDBResponse, PublicationUpdateDBRequest,
};
use crate::domain::images::assign_positions;
use crate::domain::Category;
use crate::types::{abbrev_uuid, PublicationId, PublicationImageId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing publications
#[derive(Debug, Clone, Default)]
pub struct PublicationFilter {
    pub category: Option<Category>,
    pub skip: i64,
    /// `None` returns every remaining row
    pub limit: Option<i64>,
}

impl PublicationFilter {
    pub fn new(skip: i64, limit: Option<i64>) -> Self {
        Self {
            category: None,
            skip,
            limit,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

// Database entity models
#[derive(Debug, Clone, FromRow)]
struct Publication {
    pub id: PublicationId,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub description: String,
    pub category: String,
    pub specs: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct PublicationImage {
    pub id: PublicationImageId,
    pub publication_id: PublicationId,
    pub image_path: String,
    pub is_cover: bool,
    pub position: i32,
}

impl From<PublicationImage> for PublicationImageDBResponse {
    fn from(src: PublicationImage) -> Self {
        Self {
            id: src.id,
            publication_id: src.publication_id,
            image_path: src.image_path,
            is_cover: src.is_cover,
            position: src.position,
        }
    }
}

impl Publication {
    fn into_response(self, images: Vec<PublicationImageDBResponse>) -> std::result::Result<PublicationDBResponse, anyhow::Error> {
        Ok(PublicationDBResponse {
            id: self.id,
            title: self.title,
            price: self.price,
            currency: self.currency,
            description: self.description,
            category: self.category.parse()?,
            specs: self.specs,
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct Publications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Publications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Image rows for the given publications, grouped by publication and ordered by position
    async fn images_for(&mut self, ids: &[PublicationId]) -> Result<HashMap<PublicationId, Vec<PublicationImageDBResponse>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PublicationImage>(
            r#"
            SELECT id, publication_id, image_path, is_cover, position
            FROM publication_images
            WHERE publication_id = ANY($1)
            ORDER BY publication_id, position
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut grouped: HashMap<PublicationId, Vec<PublicationImageDBResponse>> = HashMap::new();
        for row in rows {
            grouped.entry(row.publication_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn insert_images(&mut self, id: PublicationId, paths: &[String]) -> Result<Vec<PublicationImageDBResponse>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = assign_positions(paths.iter().cloned());
        let image_paths: Vec<String> = resolved.iter().map(|i| i.image_path.clone()).collect();
        let covers: Vec<bool> = resolved.iter().map(|i| i.is_cover).collect();
        let positions: Vec<i32> = resolved.iter().map(|i| i.position).collect();

        let mut rows = sqlx::query_as::<_, PublicationImage>(
            r#"
            INSERT INTO publication_images (publication_id, image_path, is_cover, position)
            SELECT $1::uuid, image_path, is_cover, position
            FROM UNNEST($2::text[], $3::bool[], $4::int4[]) AS t(image_path, is_cover, position)
            RETURNING id, publication_id, image_path, is_cover, position
            "#,
        )
        .bind(id)
        .bind(&image_paths)
        .bind(&covers)
        .bind(&positions)
        .fetch_all(&mut *self.db)
        .await?;

        rows.sort_by_key(|row| row.position);
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Replace the whole image set of a publication with `paths`, in order.
    #[instrument(skip(self, paths), fields(publication_id = %abbrev_uuid(&id), count = paths.len()), err)]
    pub async fn replace_images(&mut self, id: PublicationId, paths: &[String]) -> Result<Vec<PublicationImageDBResponse>> {
        sqlx::query("DELETE FROM publication_images WHERE publication_id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        self.insert_images(id, paths).await
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Publications<'c> {
    type CreateRequest = PublicationCreateDBRequest;
    type UpdateRequest = PublicationUpdateDBRequest;
    type Response = PublicationDBResponse;
    type Id = PublicationId;
    type Filter = PublicationFilter;

    #[instrument(skip(self, request), fields(category = %request.category, images = request.images.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let publication = sqlx::query_as::<_, Publication>(
            r#"
            INSERT INTO publications (title, price, currency, description, category, specs)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(request.price)
        .bind(&request.currency)
        .bind(&request.description)
        .bind(request.category.as_str())
        .bind(request.specs.to_value())
        .fetch_one(&mut *self.db)
        .await?;

        let images = self.insert_images(publication.id, &request.images).await?;
        Ok(publication.into_response(images)?)
    }

    #[instrument(skip(self), fields(publication_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let publication = sqlx::query_as::<_, Publication>("SELECT * FROM publications WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match publication {
            Some(p) => {
                let images = self.images_for(&[p.id]).await?.remove(&p.id).unwrap_or_default();
                Ok(Some(p.into_response(images)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), fields(category = ?filter.category, skip = filter.skip, limit = ?filter.limit), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let publications = sqlx::query_as::<_, Publication>(
            r#"
            SELECT * FROM publications
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY created_at ASC, id ASC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        let ids: Vec<PublicationId> = publications.iter().map(|p| p.id).collect();
        let mut images = self.images_for(&ids).await?;

        publications
            .into_iter()
            .map(|p| {
                let publication_images = images.remove(&p.id).unwrap_or_default();
                Ok(p.into_response(publication_images)?)
            })
            .collect()
    }

    #[instrument(skip(self), fields(publication_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // publication_images rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM publications WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(publication_id = %abbrev_uuid(&id), replace_images = request.images.is_some()), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let publication = sqlx::query_as::<_, Publication>(
            r#"
            UPDATE publications SET
                title = COALESCE($2, title),
                price = COALESCE($3, price),
                currency = COALESCE($4, currency),
                description = COALESCE($5, description),
                specs = COALESCE($6, specs),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.title.as_deref())
        .bind(request.price)
        .bind(request.currency.as_deref())
        .bind(request.description.as_deref())
        .bind(request.specs.as_ref().map(|s| s.to_value()))
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        let images = match &request.images {
            Some(paths) => self.replace_images(id, paths).await?,
            None => self.images_for(&[id]).await?.remove(&id).unwrap_or_default(),
        };

        Ok(publication.into_response(images)?)
    }
}
