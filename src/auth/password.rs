use anyhow::Context;
use tracing::{error, warn};

/// bcrypt work factor used when none is configured.
pub const DEFAULT_COST: u32 = 10;

/// Hashes `plain` with a fresh random salt on the blocking pool.
pub async fn hash_password(plain: &str, cost: u32) -> anyhow::Result<String> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .context("hash task panicked")?
        .map_err(|e| {
            error!(error = %e, "bcrypt hash error");
            anyhow::anyhow!(e.to_string())
        })
}

/// Compares `plain` against a stored bcrypt hash. Never fails: a malformed
/// hash or a failed task counts as a mismatch.
pub async fn verify_password(plain: &str, hash: &str) -> bool {
    let plain = plain.to_owned();
    let hash = hash.to_owned();
    match tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => {
            warn!(error = %e, "bcrypt verify error");
            false
        }
        Err(e) => {
            error!(error = %e, "verify task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password, TEST_COST)
            .await
            .expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(hash.starts_with("$2"));
        assert!(verify_password(password, &hash).await);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple", TEST_COST)
            .await
            .expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).await);
    }

    #[tokio::test]
    async fn fresh_salt_per_hash() {
        let a = hash_password("same", TEST_COST).await.unwrap();
        let b = hash_password("same", TEST_COST).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn default_cost_is_encoded_in_hash() {
        let hash = hash_password("secret123", DEFAULT_COST).await.unwrap();
        assert!(hash.contains("$10$"));
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("anything", "not-a-valid-hash").await);
    }

    #[tokio::test]
    async fn invalid_cost_is_an_error() {
        assert!(hash_password("secret123", 2).await.is_err());
    }
}
