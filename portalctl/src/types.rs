//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases, except auth methods which are a small
//! seeded lookup table keyed by a serial integer.
//!
//! - [`UserId`]: User account identifier
//! - [`SessionId`]: Session record identifier
//! - [`UserAuthMethodId`]: Identifier of a user's binding to an auth method
//! - [`AccountLinkId`]: Identifier of a link between two user records
//! - [`AuthMethodId`]: Seeded auth method identifier
//!
//! [`abbrev_uuid`] abbreviates UUIDs to their first 8 chars for logging.

use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type SessionId = Uuid;
pub type UserAuthMethodId = Uuid;
pub type AccountLinkId = Uuid;
pub type AuthMethodId = i32;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Abbreviate a bearer token for logs. Never log a full token.
pub fn abbrev_token(token: &str) -> String {
    token.chars().take(6).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_abbrev_token_short_input() {
        assert_eq!(abbrev_token("abc"), "abc");
        assert_eq!(abbrev_token("abcdefghijkl"), "abcdef");
    }
}
