//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed connection and returns models from [`crate::db::models`].
//!
//! - [`Users`]: User identities
//! - [`AuthMethods`]: Seeded auth method descriptors
//! - [`UserAuthMethods`]: Bindings between users and auth methods, including password hashes
//! - [`Sessions`]: Session issue, lookup, renewal and expiry
//! - [`AccountLinks`]: Links between user records

pub mod account_links;
pub mod auth_methods;
pub mod repository;
pub mod sessions;
pub mod user_auth_methods;
pub mod users;

pub use account_links::AccountLinks;
pub use auth_methods::AuthMethods;
pub use repository::Repository;
pub use sessions::Sessions;
pub use user_auth_methods::UserAuthMethods;
pub use users::Users;
