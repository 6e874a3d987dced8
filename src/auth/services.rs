use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;

use crate::auth::dto::CredentialsPayload;
use crate::error::{AppError, AppResult};

/// Trim and lower-case an email before it is stored or compared.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validated login or registration input. `email` is normalized.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl TryFrom<CredentialsPayload> for Credentials {
    type Error = AppError;

    fn try_from(payload: CredentialsPayload) -> AppResult<Self> {
        let email = normalize_email(payload.email.as_deref().unwrap_or_default());
        let password = payload.password.unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Email and password are required".into()));
        }
        Ok(Self { email, password })
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash_password: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("argon2 parse hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Argon2 is CPU bound, so hashing runs off the async workers.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

pub async fn verify_password_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

lazy_static! {
    /// Stand-in hash for logins with an unknown email, built once per process.
    static ref DUMMY_HASH: Option<String> = hash_password("gatekeep-unknown-user").ok();
}

/// Spends the same Argon2 work as a real verify, so an unknown email answers
/// no faster than a wrong password. The outcome is always a rejection.
pub async fn verify_unknown_user(plain: String) {
    let hash = tokio::task::spawn_blocking(|| DUMMY_HASH.clone())
        .await
        .ok()
        .flatten();
    if let Some(hash) = hash {
        let _ = verify_password_blocking(plain, hash).await;
    }
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").expect("hash a");
        let b = hash_password("same").expect("hash b");
        assert_ne!(a, b);
        assert!(!a.contains("same"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        let msg = err.to_string();
        assert!(!msg.is_empty());
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.clone().expect("dummy hash");
        let parsed = PasswordHash::new(&hash).expect("phc string");
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert!(!verify_password("anything", &hash).expect("verify"));
    }

    #[tokio::test]
    async fn verify_unknown_user_does_argon2_work() {
        // Warm the lazily built hash so only the verify is timed.
        verify_unknown_user("warmup".into()).await;

        let hash = hash_password("pw").expect("hash");
        let started = std::time::Instant::now();
        let _ = verify_password_blocking("nope".into(), hash).await;
        let real = started.elapsed();

        let started = std::time::Instant::now();
        verify_unknown_user("nope".into()).await;
        let dummy = started.elapsed();

        assert!(dummy * 10 >= real, "dummy verify {dummy:?} vs real verify {real:?}");
    }

    #[tokio::test]
    async fn blocking_wrappers_agree_with_sync_versions() {
        let hash = hash_password_blocking("x".into()).await.expect("hash");
        assert!(verify_password_blocking("x".into(), hash.clone()).await.expect("verify"));
        assert!(!verify_password_blocking("y".into(), hash).await.expect("verify"));
    }
}
