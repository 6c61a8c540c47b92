//! Password hashing utilities

use bcrypt::{hash, verify, DEFAULT_COST};

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_never_equals_plaintext() {
        let hashed = hash_password("Passw0rd1").unwrap();
        assert_ne!(hashed, "Passw0rd1");
    }

    #[test]
    fn verifies_correct_password() {
        let hashed = hash_password("Passw0rd1").unwrap();
        assert!(verify_password("Passw0rd1", &hashed).unwrap());
    }

    #[test]
    fn rejects_wrong_password() {
        let hashed = hash_password("Passw0rd1").unwrap();
        assert!(!verify_password("passw0rd1", &hashed).unwrap());
    }
}
