//! Database record models matching table schemas.
//!
//! These structs correspond to rows of the credential store tables and are kept separate from
//! the API models in [`crate::api::models`] so storage and wire representations can evolve
//! independently.
//!
//! - [`users`]: User identities
//! - [`auth_methods`]: Seeded auth method descriptors and per-user bindings
//! - [`sessions`]: Bearer-token sessions
//! - [`account_links`]: Links chaining two user records into one account

pub mod account_links;
pub mod auth_methods;
pub mod sessions;
pub mod users;
