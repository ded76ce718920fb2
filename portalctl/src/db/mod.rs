//! Credential store: the persistence layer for users, auth methods, sessions and account links.
//!
//! Built on SQLx with PostgreSQL, following the Repository pattern.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, route gate)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories borrow a `&mut PgConnection`, so they work the same over a pooled connection or
//! a transaction. Writes that must land together (a user and its first auth method binding) are
//! done on one transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let user = Users::new(&mut tx).create(&request).await?;
//! UserAuthMethods::new(&mut tx).create(&binding).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded into the binary. See [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
