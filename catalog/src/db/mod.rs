//! Database layer for data persistence and access.
//!
//! SQLx over PostgreSQL, organised as repositories:
//!
//! ```text
//! API handlers ─→ db::handlers (repositories) ─→ db::models ─→ PostgreSQL
//! ```
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Request and response records for repositories
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Mutating handlers build repositories from a transaction and commit once
//! every write succeeded. A dropped transaction rolls back, so a listing and
//! its image rows are either both written or neither is.
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded by [`crate::migrator`]:
//!
//! ```ignore
//! catalog::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
