//! HTTP handler for turning free text into a draft listing.

use axum::{extract::State, response::Json};
use tracing::{debug, instrument};

use crate::{
    AppState,
    api::models::bot::{ParseRequest, ParseResponse},
    domain::TextParser,
    errors::{Error, Result},
};

/// Parse free text into a draft listing.
#[utoipa::path(
    post,
    path = "/bot/parse",
    tag = "bot",
    summary = "Parse listing text",
    description = "Extract title, price, category and specs from a free-text listing. Nothing is stored; \
                   the draft is meant to prefill the editor and is not validated.",
    request_body = ParseRequest,
    responses(
        (status = 200, description = "Draft listing", body = ParseResponse),
        (status = 400, description = "Missing or empty text"),
    )
)]
#[instrument(skip_all)]
pub async fn parse_listing(State(state): State<AppState>, Json(request): Json<ParseRequest>) -> Result<Json<ParseResponse>> {
    let text = request
        .text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| Error::bad_request("text is required"))?;

    let draft = TextParser::new(state.config.listings.default_currency.clone()).parse(&text);
    debug!(category = %draft.category, price = %draft.price, "Parsed listing text");

    Ok(Json(ParseResponse { success: true, data: draft }))
}
