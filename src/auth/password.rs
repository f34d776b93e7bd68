//! Password hashing and verification using Argon2
//!
//! Argon2id with default parameters; hashes are stored as PHC strings so
//! the salt and parameters travel with the hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::LecternError;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, LecternError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LecternError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, LecternError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| LecternError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let hash = hash_password("algebra-before-calculus").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("algebra-before-calculus", &hash).unwrap());
        assert!(!verify_password("calculus-before-algebra", &hash).unwrap());
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let hash1 = hash_password("shared-password").unwrap();
        let hash2 = hash_password("shared-password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("shared-password", &hash1).unwrap());
        assert!(verify_password("shared-password", &hash2).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
