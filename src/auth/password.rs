//! Argon2 password hashing.

use argon2::{
    Argon2, Params, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString},
};
use password_hash::rand_core::OsRng;

use super::AuthError;

const HASH_PREFIXES: [&str; 3] = ["$argon2id$", "$argon2i$", "$argon2d$"];

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Check `plain` against a stored PHC hash string. A malformed hash never
/// verifies.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Heuristic: does `value` already look like a stored Argon2 hash?
///
/// Checks the PHC prefix, that the string parses as a PHC hash carrying a
/// version, a salt and an output, and that its cost parameters are valid
/// Argon2 parameters. A plaintext password that happens to be a complete
/// Argon2 string would still be misclassified, so callers that know the
/// answer should pass it explicitly instead of relying on this.
pub fn looks_like_password_hash(value: &str) -> bool {
    if !HASH_PREFIXES.iter().any(|prefix| value.starts_with(prefix)) {
        return false;
    }
    let Ok(parsed) = PasswordHash::new(value) else {
        return false;
    };
    parsed.version.is_some()
        && parsed.salt.is_some()
        && parsed.hash.is_some()
        && Params::try_from(&parsed).is_ok()
}

/// Hash `value` unless it already looks like a hash, in which case it is
/// returned unchanged.
pub fn hash_unless_hashed(value: &str) -> Result<String, AuthError> {
    if looks_like_password_hash(value) {
        Ok(value.to_string())
    } else {
        hash_password(value)
    }
}
