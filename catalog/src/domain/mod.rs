//! Listing ingestion and normalization.
//!
//! Everything in here is pure: no database, no HTTP. The API handlers and the
//! editor-side submit flow in [`crate::client`] are thin shells around it.
//!
//! - [`category`]: The closed set of listing categories
//! - [`specs`]: Per-category validation of the specs attribute map
//! - [`parser`]: Heuristic free-text extraction into a [`parser::Draft`]
//! - [`images`]: Ordered image-set editing and reconciliation with upload results

pub mod category;
pub mod images;
pub mod parser;
pub mod specs;

pub use category::Category;
pub use images::{ImageSetEditor, ImageSlot, LocalImage, ReconcileError, ResolvedImage, SlotId, SlotOrigin};
pub use parser::{Draft, DraftSpecs, TextParser};
pub use specs::{Condition, Specs, SpecsError};
