//! Password hashing and verification.
//!
//! Two schemes are supported. [`PasswordScheme::Argon2`] produces salted Argon2id PHC strings
//! and is the default for new credentials. [`PasswordScheme::LegacySha256`] produces an unsalted
//! SHA-256 hex digest, so two users with the same password share the same stored value; it
//! exists only for compatibility with credentials written by the previous portal.
//!
//! Verification detects the format of the stored value, so either kind of stored credential
//! verifies whatever scheme is currently configured. A stored value that cannot be parsed never
//! matches.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use tracing::warn;

use crate::errors::Error;

/// Scheme used when storing a new password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordScheme {
    #[default]
    Argon2,
    LegacySha256,
}

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Argon2id RFC recommendations
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Unsalted SHA-256 digest, 64 lowercase hex characters.
pub fn legacy_digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Hash a string using Argon2 with the given parameters.
pub fn hash_string_with_params(input: &str, params: Argon2Params) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = params.to_argon2()?;

    let hash = argon2.hash_password(input.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash string: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Hash a password for storage using the configured scheme.
pub fn hash_password(input: &str, scheme: PasswordScheme, params: Argon2Params) -> Result<String, Error> {
    match scheme {
        PasswordScheme::Argon2 => hash_string_with_params(input, params),
        PasswordScheme::LegacySha256 => Ok(legacy_digest(input)),
    }
}

/// Verify a password against a stored hash of either scheme.
///
/// Argon2 verification uses the parameters embedded in the hash itself.
pub fn verify_password(input: &str, stored: &str) -> Result<bool, Error> {
    if stored.starts_with("$argon2") {
        let parsed_hash = match PasswordHash::new(stored) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Stored Argon2 hash is malformed: {e}");
                return Ok(false);
            }
        };
        return Ok(Argon2::default().verify_password(input.as_bytes(), &parsed_hash).is_ok());
    }

    Ok(legacy_digest(input).eq_ignore_ascii_case(stored))
}

/// Hash on a blocking thread so Argon2 does not stall the async runtime.
pub async fn hash_password_blocking(input: String, scheme: PasswordScheme, params: Argon2Params) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || hash_password(&input, scheme, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Verify on a blocking thread so Argon2 does not stall the async runtime.
pub async fn verify_password_blocking(input: String, stored: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || verify_password(&input, &stored))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?
}

/// Throwaway Argon2 hash, built on first use from the parameters of that call
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

fn dummy_hash(params: Argon2Params) -> Result<&'static str, Error> {
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash);
    }
    let hash = hash_string_with_params("portalctl-no-such-account", params)?;
    Ok(DUMMY_HASH.get_or_init(|| hash))
}

/// Run a full Argon2 verification that cannot succeed.
///
/// Login calls this when there is no stored hash to check, so an unknown account costs the same
/// as a wrong password.
pub async fn verify_dummy_blocking(input: String, params: Argon2Params) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || {
        let stored = dummy_hash(params)?;
        verify_password(&input, stored).map(|_| ())
    })
    .await
    .map_err(|e| Error::Internal {
        operation: format!("spawn dummy verification task: {e}"),
    })?
}

#[cfg(test)]
pub(crate) fn dummy_hash_built() -> bool {
    DUMMY_HASH.get().is_some()
}
