use crate::error::{AppError, AppResult};

/// Hashes a password on the blocking pool
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Checks a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hashed: String) -> AppResult<bool> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hashed = hash_password("testpassword".to_string(), 4).await.unwrap();
        assert_ne!(hashed, "testpassword");
        assert!(verify_password("testpassword".to_string(), hashed.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrongpassword".to_string(), hashed)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        assert!(!verify_password("testpassword".to_string(), "hashed_password".to_string())
            .await
            .unwrap());
    }
}
