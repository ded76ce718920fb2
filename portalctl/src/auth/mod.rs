//! Authentication: password hashing, opaque database-backed sessions, and the route gate.
//!
//! # Flow
//!
//! 1. `POST /api/auth/login` verifies the password against the user's password binding and
//!    [issues](session::issue_session) a session: 256 random bits, base64url encoded, stored in
//!    `sessions` with an expiry of now + `auth.session.timeout`.
//! 2. The token is handed back in an HTTP-only `auth_token` cookie (and in the body).
//! 3. On every gated request the [route gate](middleware::route_gate) reads the cookie and
//!    [validates](session::validate_session) it. A valid session has its expiry pushed forward when
//!    sliding renewal is enabled.
//! 4. `POST /api/auth/logout` sets the session's expiry to now. Rows are never deleted.
//!
//! # Modules
//!
//! - [`password`]: Argon2 and legacy SHA-256 password hashing
//! - [`session`]: Session token generation, issue, validation and cookies
//! - [`current_session`]: Extractor for handlers that need the validated session
//! - [`middleware`]: Route gate applied to the whole application

pub mod current_session;
pub mod middleware;
pub mod password;
pub mod session;
