use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::error::ServerError;

/// Hashes a password with argon2id into a PHC string.
pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Hashing(e.to_string()))
}

/// Checks a password against a stored PHC hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash_password("testpassword").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("testpassword", &stored));
        assert!(!verify_password("testpassword2", &stored));
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash_password("testpassword").unwrap(), hash_password("testpassword").unwrap());
    }

    #[test]
    fn stored_hash_carries_memory_hard_parameters() {
        let stored = hash_password("testpassword").unwrap();
        let parsed = PasswordHash::new(&stored).unwrap();
        let memory_cost = parsed.params.get_decimal("m").unwrap();
        assert!(memory_cost >= argon2::Params::DEFAULT_M_COST);
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "blake3$00$00"));
        assert!(!verify_password("x", "$argon2id$v=19$garbage"));
    }
}
