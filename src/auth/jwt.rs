use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Access token claims; `sub` holds the user's email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, subject: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AppError::Unauthorized("Could not validate credentials".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("test_secret_key", 30);
        let token = tokio_test::assert_ok!(issuer.issue("cook@example.com"));

        let claims = tokio_test::assert_ok!(issuer.verify(&token));
        assert_eq!(claims.sub, "cook@example.com");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new("one", 30).issue("cook@example.com").unwrap();
        let err = TokenIssuer::new("two", 30).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new("test_secret_key", -10);
        let token = issuer.issue("cook@example.com").unwrap();
        tokio_test::assert_err!(issuer.verify(&token));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = TokenIssuer::new("test_secret_key", 30);
        assert!(issuer.verify("invalid_token").is_err());
    }
}
