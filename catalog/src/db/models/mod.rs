//! Database record models matching table schemas.
//!
//! These are the shapes repositories accept and return. They are kept apart
//! from the API models in [`crate::api::models`] so the stored and the wire
//! representation can evolve independently.
//!
//! - [`publications`]: Listings and their ordered image rows

pub mod publications;
