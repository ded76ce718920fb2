//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures (camelCase JSON)
//!
//! # API Structure
//!
//! - **Authentication** (`/api/auth/*`): register, login, logout, anonymous sign-in, identity
//! - **Health** (`/healthz`): liveness probe
//!
//! The OpenAPI document for these endpoints is served at `/api/openapi.json`.

pub mod handlers;
pub mod models;
