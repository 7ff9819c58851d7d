//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! Everything is served under `/api`:
//!
//! - **Publications** (`/api/publications`): Public listing and lookup, authenticated create/update/delete
//! - **Uploads** (`/api/upload`): Authenticated multipart image batches
//! - **Bot** (`/api/bot/parse`): Free-text to draft listing
//! - **Health** (`/api/health`): Liveness
//!
//! OpenAPI documentation is served at `/api/docs`.

pub mod handlers;
pub mod models;
