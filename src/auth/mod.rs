//! Password hashing with bcrypt.
//!
//! Hashing and verification run on the blocking thread pool; bcrypt is
//! CPU-bound and would stall the async runtime otherwise.

use bcrypt::BcryptError;

use crate::config;

/// Minimum accepted password length, for login input and password changes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plain-text password with the configured cost factor.
pub async fn hash_password(password: &str) -> Result<String, BcryptError> {
    let password = password.to_string();
    let cost = config::config().security.bcrypt_cost;
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| BcryptError::InvalidHash(format!("join error: {e}")))?
}

/// Verify a plain-text password against a stored bcrypt hash.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, BcryptError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| BcryptError::InvalidHash(format!("join error: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        // Low cost keeps the test fast; production cost comes from config
        let hash = tokio::task::spawn_blocking(|| bcrypt::hash("password123", 4))
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("password123", &hash).await.unwrap());
        assert!(!verify_password("wrong-password", &hash).await.unwrap());
    }
}
