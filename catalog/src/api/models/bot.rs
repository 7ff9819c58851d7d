//! API models for the free-text parse endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Draft;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ParseRequest {
    /// Raw listing text, one attribute per line works best
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParseResponse {
    pub success: bool,
    pub data: Draft,
}
