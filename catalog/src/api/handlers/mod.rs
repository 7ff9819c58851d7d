//! HTTP request handlers for all API endpoints.
//!
//! Handlers validate input, call into [`crate::domain`] and the repositories in
//! [`crate::db::handlers`], and map failures to [`crate::errors::Error`].
//! Authenticated routes take a [`crate::auth::current_user::CurrentUser`].

pub mod bot;
pub mod health;
pub mod publications;
pub mod uploads;
