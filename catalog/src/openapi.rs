//! OpenAPI documentation for the catalog API at `/api/*`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, domain};

/// Bearer token and session cookie schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token issued by the login service:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("catalog_session"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        description = "Listing ingestion for a marketplace of vehicles, machinery and tools.",
    ),
    servers(
        (url = "/api", description = "Catalog API server")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::health::health,
        api::handlers::publications::list_publications,
        api::handlers::publications::get_publication,
        api::handlers::publications::create_publication,
        api::handlers::publications::update_publication,
        api::handlers::publications::delete_publication,
        api::handlers::uploads::upload_images,
        api::handlers::bot::parse_listing,
    ),
    components(
        schemas(
            domain::Category,
            domain::Condition,
            domain::Draft,
            domain::DraftSpecs,
            api::models::health::HealthResponse,
            api::models::publications::PublicationCreate,
            api::models::publications::PublicationUpdate,
            api::models::publications::PublicationResponse,
            api::models::publications::PublicationImageResponse,
            api::models::publications::PublicationEnvelope,
            api::models::publications::DeleteResponse,
            api::models::uploads::UploadedFile,
            api::models::uploads::UploadResponse,
            api::models::bot::ParseRequest,
            api::models::bot::ParseResponse,
        )
    ),
    tags(
        (name = "publications", description = "Listings with their category-specific specs and ordered images.

Specs are checked against the category on every write:
- **VEHICULO** needs `km` and `year`
- **MAQUINARIA** needs `horas` and `year`
- **HERRAMIENTA** needs `condicion` (`Nuevo` or `Usado`)"),
        (name = "uploads", description = "Batch image upload. The returned paths go into a publication's `images` list."),
        (name = "bot", description = "Free-text listing parser for prefilling the editor."),
        (name = "health", description = "Service liveness."),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        for path in ["/health", "/publications", "/publications/{id}", "/upload", "/bot/parse"] {
            assert!(json["paths"].get(path).is_some(), "missing {path}");
        }
        assert!(json["components"]["securitySchemes"].get("BearerAuth").is_some());
        assert!(json["components"]["schemas"].get("PublicationResponse").is_some());
    }
}
