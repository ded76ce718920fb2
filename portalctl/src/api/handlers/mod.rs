//! HTTP request handlers.
//!
//! - [`auth`]: Registration, login, logout, anonymous sign-in and identity
//! - [`health`]: Liveness probe and the JSON fallback for unknown routes
//!
//! Handlers return [`crate::errors::Error`], which converts into a JSON error body with the
//! matching status code.

pub mod auth;
pub mod health;
