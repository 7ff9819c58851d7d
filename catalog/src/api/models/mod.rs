//! API request and response data models.
//!
//! These define the public wire contract and are kept separate from
//! [`crate::db::models`]. Successful mutations answer with a
//! `{success, message, data}` envelope, errors with `{success: false, error}`.
//!
//! - [`publications`]: Listing create/update bodies and responses
//! - [`uploads`]: Image upload results
//! - [`bot`]: Free-text parse request and response
//! - [`health`]: Liveness response

pub mod bot;
pub mod health;
pub mod publications;
pub mod uploads;
