//! Authentication for the editor endpoints.
//!
//! Mutating routes (create, update, delete, upload) require a signed session
//! token. Tokens are minted by the identity service that fronts the editor;
//! this service only verifies them. A token is accepted from either:
//!
//! - `Authorization: Bearer <token>`
//! - the session cookie named by `auth.session.cookie_name`
//!
//! # Modules
//!
//! - [`session`]: JWT claims, creation and verification
//! - [`current_user`]: The [`current_user::CurrentUser`] extractor

pub mod current_user;
pub mod session;
