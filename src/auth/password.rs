//! bcrypt password hashing. Both calls are CPU-bound and run on the blocking
//! pool so request tasks are not stalled.

use super::AuthError;

pub const BCRYPT_COST: u32 = 10;

pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST)).await??;
    Ok(hashed)
}

/// Malformed stored hashes count as a mismatch
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    match result {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            Ok(false)
        }
    }
}
