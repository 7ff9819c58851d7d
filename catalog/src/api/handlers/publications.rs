//! HTTP handlers for publication endpoints.
//!
//! Reads are public. Writes require an authenticated [`CurrentUser`] and run
//! the publication row and its image rows in one transaction.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::{
    AppState,
    api::models::publications::{
        DeleteResponse, ListPublicationsQuery, PublicationCreate, PublicationEnvelope, PublicationResponse, PublicationUpdate,
    },
    auth::current_user::CurrentUser,
    db::handlers::{PublicationFilter, Publications, Repository},
    db::models::publications::{PublicationCreateDBRequest, PublicationUpdateDBRequest},
    domain::Specs,
    errors::{Error, Result},
    types::{PublicationId, abbrev_uuid},
};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

fn not_found(id: PublicationId) -> Error {
    Error::NotFound {
        resource: "Publication".to_string(),
        id: id.to_string(),
    }
}

fn check_price(price: Decimal) -> Result<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(Error::bad_request("price must not be negative"));
    }
    Ok(price)
}

fn check_images(images: &[String]) -> Result<()> {
    if let Some(index) = images.iter().position(|path| path.trim().is_empty()) {
        return Err(Error::bad_request(format!("image path at index {index} is blank")));
    }
    Ok(())
}

/// Trimmed value, or `None` when absent or blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// List publications with their images.
#[utoipa::path(
    get,
    path = "/publications",
    tag = "publications",
    summary = "List publications",
    description = "List publications in creation order, each with its ordered images. Optionally filtered by category.",
    params(ListPublicationsQuery),
    responses(
        (status = 200, description = "List of publications", body = [PublicationResponse]),
        (status = 400, description = "Invalid query"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all)]
pub async fn list_publications(
    State(state): State<AppState>,
    Query(query): Query<ListPublicationsQuery>,
) -> Result<Json<Vec<PublicationResponse>>> {
    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let mut filter = PublicationFilter::new(skip, Some(limit));
    if let Some(category) = query.category {
        filter = filter.with_category(category);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Publications::new(&mut conn);
    let publications = repo.list(&filter).await?;

    Ok(Json(publications.into_iter().map(Into::into).collect()))
}

/// Get a single publication.
#[utoipa::path(
    get,
    path = "/publications/{id}",
    tag = "publications",
    summary = "Get publication",
    params(
        ("id" = uuid::Uuid, Path, description = "Publication ID"),
    ),
    responses(
        (status = 200, description = "Publication", body = PublicationResponse),
        (status = 404, description = "Publication not found"),
        (status = 500, description = "Internal server error"),
    )
)]
#[instrument(skip_all, fields(id = %abbrev_uuid(&id)))]
pub async fn get_publication(State(state): State<AppState>, Path(id): Path<PublicationId>) -> Result<Json<PublicationResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Publications::new(&mut conn);

    let publication = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(publication.into()))
}

/// Create a publication.
#[utoipa::path(
    post,
    path = "/publications",
    tag = "publications",
    summary = "Create publication",
    description = "Create a publication. Specs are validated against the category's required fields, \
                   and `images` is stored in the given order with the first entry as cover.",
    request_body = PublicationCreate,
    responses(
        (status = 201, description = "Publication created", body = PublicationEnvelope),
        (status = 400, description = "Missing fields, invalid specs or invalid image list"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[instrument(skip_all, fields(user = %abbrev_uuid(&current_user.id)))]
pub async fn create_publication(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PublicationCreate>,
) -> Result<(StatusCode, Json<PublicationEnvelope>)> {
    let (Some(title), Some(price), Some(category)) = (non_blank(request.title), request.price, request.category) else {
        return Err(Error::bad_request("title, price and category are required"));
    };
    let price = check_price(price)?;
    check_images(&request.images)?;

    let raw_specs = request.specs.unwrap_or_else(|| serde_json::json!({}));
    let specs = Specs::validate(category, &raw_specs)?;

    let db_request = PublicationCreateDBRequest {
        title,
        price,
        currency: non_blank(request.currency).unwrap_or_else(|| state.config.listings.default_currency.clone()),
        description: request.description.unwrap_or_default(),
        category,
        specs,
        images: request.images,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let publication = {
        let mut repo = Publications::new(&mut tx);
        repo.create(&db_request).await?
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(
        publication_id = %abbrev_uuid(&publication.id),
        category = %publication.category,
        images = publication.images.len(),
        "Publication created"
    );

    Ok((
        StatusCode::CREATED,
        Json(PublicationEnvelope {
            success: true,
            message: "Publication created".to_string(),
            data: publication.into(),
        }),
    ))
}

/// Update a publication.
#[utoipa::path(
    put,
    path = "/publications/{id}",
    tag = "publications",
    summary = "Update publication",
    description = "Replace-by-merge update. Omitted scalar fields keep their stored value; `specs` and `images` \
                   replace the stored ones when given. The category cannot change.",
    params(
        ("id" = uuid::Uuid, Path, description = "Publication ID"),
    ),
    request_body = PublicationUpdate,
    responses(
        (status = 200, description = "Publication updated", body = PublicationEnvelope),
        (status = 400, description = "Category change, invalid specs or invalid image list"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Publication not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[instrument(skip_all, fields(id = %abbrev_uuid(&id), user = %abbrev_uuid(&current_user.id)))]
pub async fn update_publication(
    State(state): State<AppState>,
    Path(id): Path<PublicationId>,
    current_user: CurrentUser,
    Json(request): Json<PublicationUpdate>,
) -> Result<Json<PublicationEnvelope>> {
    if let Some(title) = &request.title
        && title.trim().is_empty()
    {
        return Err(Error::bad_request("title must not be blank"));
    }
    let price = request.price.map(check_price).transpose()?;
    if let Some(images) = &request.images {
        check_images(images)?;
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let publication = {
        let mut repo = Publications::new(&mut tx);
        let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;

        if let Some(category) = request.category
            && category != existing.category
        {
            return Err(Error::bad_request(format!(
                "category cannot be changed from {} to {}",
                existing.category, category
            )));
        }

        let specs = request
            .specs
            .as_ref()
            .map(|raw| Specs::validate(existing.category, raw))
            .transpose()?;

        let db_request = PublicationUpdateDBRequest {
            title: request.title.map(|t| t.trim().to_string()),
            price,
            currency: non_blank(request.currency),
            description: request.description,
            specs,
            images: request.images,
        };
        repo.update(id, &db_request).await?
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(images = publication.images.len(), "Publication updated");

    Ok(Json(PublicationEnvelope {
        success: true,
        message: "Publication updated".to_string(),
        data: publication.into(),
    }))
}

/// Delete a publication and its images.
#[utoipa::path(
    delete,
    path = "/publications/{id}",
    tag = "publications",
    summary = "Delete publication",
    description = "Delete a publication. Its image rows are removed with it; stored files are left in place.",
    params(
        ("id" = uuid::Uuid, Path, description = "Publication ID"),
    ),
    responses(
        (status = 200, description = "Publication deleted", body = DeleteResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Publication not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[instrument(skip_all, fields(id = %abbrev_uuid(&id), user = %abbrev_uuid(&current_user.id)))]
pub async fn delete_publication(
    State(state): State<AppState>,
    Path(id): Path<PublicationId>,
    current_user: CurrentUser,
) -> Result<Json<DeleteResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = {
        let mut repo = Publications::new(&mut tx);
        repo.delete(id).await?
    };
    if !deleted {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!("Publication deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Publication deleted".to_string(),
    }))
}
