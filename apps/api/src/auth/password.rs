//! Argon2id password hashing. Hashing runs on the blocking pool so request
//! workers are not stalled by the KDF.

use anyhow::{anyhow, Context, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

pub fn hash_password_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password_blocking(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .context("password hashing task panicked")?
}

pub async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &stored_hash))
        .await
        .context("password verification task panicked")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password_blocking("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password_blocking("hunter22", &hash));
        assert!(!verify_password_blocking("hunter23", &hash));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password_blocking("secret1").unwrap();
        let b = hash_password_blocking("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password_blocking("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hash = hash_password("abcdef".to_string()).await.unwrap();
        assert!(verify_password("abcdef".to_string(), hash).await.unwrap());
    }
}
