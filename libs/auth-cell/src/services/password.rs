use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use tracing::instrument;

use crate::models::AuthError;

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        Ok(password_hash.to_string())
    }

    /// A malformed stored hash counts as a mismatch.
    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = PasswordService::hash_password("pw123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(PasswordService::verify_password("pw123", &hash));
        assert!(!PasswordService::verify_password("pw124", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!PasswordService::verify_password("pw123", "not-a-phc-string"));
        assert!(!PasswordService::verify_password("", ""));
    }
}
