//! API request and response models.
//!
//! - [`auth`]: Authentication request bodies and responses
//! - [`users`]: Public views of users, their auth methods, sessions and linked accounts

pub mod auth;
pub mod users;
