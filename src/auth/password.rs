use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use thiserror::Error;

/// Lowest work factor bcrypt accepts; tests hash at this cost.
#[cfg(test)]
pub(crate) const TEST_BCRYPT_COST: u32 = 4;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Stand-in hashes, one per work factor, compared against when a login has no
/// account to check. Built on first use.
static DECOY_HASHES: Lazy<Mutex<HashMap<u32, Arc<str>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// Verify a password on the blocking pool. A stored hash that bcrypt cannot
/// parse counts as a mismatch, not an error.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
    Ok(matched)
}

/// Spend one bcrypt verification at `cost` without an account to check it
/// against, so a missing tenant or email costs as much as a wrong password.
pub async fn verify_decoy(password: String, cost: u32) -> Result<(), PasswordError> {
    let hash = decoy_hash(cost).await?;
    verify_password(password, hash.to_string()).await?;
    Ok(())
}

async fn decoy_hash(cost: u32) -> Result<Arc<str>, PasswordError> {
    if let Some(hash) = cached_decoy(cost) {
        return Ok(hash);
    }

    let hash: Arc<str> = hash_password(uuid::Uuid::new_v4().to_string(), cost).await?.into();
    let mut decoys = DECOY_HASHES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(decoys.entry(cost).or_insert(hash).clone())
}

fn cached_decoy(cost: u32) -> Option<Arc<str>> {
    DECOY_HASHES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&cost)
        .cloned()
}
