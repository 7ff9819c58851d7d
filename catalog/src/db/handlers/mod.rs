//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (usually a transaction),
//! builds and binds its own queries and returns models from
//! [`crate::db::models`].
//!
//! - [`Publications`]: Listings together with their ordered image rows
//!
//! ```ignore
//! use catalog::db::handlers::{Publications, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let mut repo = Publications::new(&mut tx);
//! let created = repo.create(&request).await?;
//! tx.commit().await?;
//! ```

pub mod publications;
pub mod repository;

pub use publications::{PublicationFilter, Publications};
pub use repository::Repository;
