//! Session token utilities
//!
//! The authentication provider itself is external; what crosses the
//! boundary is an opaque signed token carrying the user's identity and
//! profile. This module verifies (and, for tests and tooling, issues)
//! those tokens using the `jsonwebtoken` crate.

use chrono::{Duration, Utc};
use discourse_core::Snowflake;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Profile photo URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Get the user ID as a Snowflake
    ///
    /// # Errors
    /// Returns an error if the subject cannot be parsed as a Snowflake
    pub fn user_id(&self) -> Result<Snowflake, AppError> {
        self.sub
            .parse::<i64>()
            .map(Snowflake::new)
            .map_err(|_| AppError::InvalidToken)
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Service for issuing and verifying session tokens
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: i64,
}

impl SessionTokenService {
    /// Create a new service with the given secret and expiry (seconds)
    #[must_use]
    pub fn new(secret: &str, token_expiry: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry,
        }
    }

    /// Issue a session token for a user
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue(
        &self,
        user_id: Snowflake,
        display_name: &str,
        photo_url: Option<String>,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            name: display_name.to_string(),
            picture: photo_url,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_expiry)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode session token")))
    }

    /// Verify a session token and return its claims
    ///
    /// # Errors
    /// Returns an error if the token is invalid or expired
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let validation = Validation::default();

        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                    _ => AppError::InvalidToken,
                }
            })?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("token_expiry", &self.token_expiry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> SessionTokenService {
        SessionTokenService::new("test-secret-key-that-is-long-enough", 86400)
    }

    #[test]
    fn test_issue_and_verify() {
        let service = create_test_service();
        let user_id = Snowflake::new(12345);

        let token = service
            .issue(user_id, "Ada", Some("https://example.com/a.png".to_string()))
            .unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "12345");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.picture.as_deref(), Some("https://example.com/a.png"));
        assert!(!claims.is_expired());
        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_verify_garbage_token() {
        let service = create_test_service();
        let result = service.verify("invalid.token.here");
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let issuer = SessionTokenService::new("secret-one-that-is-long-enough!!", 86400);
        let verifier = SessionTokenService::new("secret-two-that-is-long-enough!!", 86400);

        let token = issuer.issue(Snowflake::new(1), "Ada", None).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_claims_user_id_rejects_non_numeric() {
        let claims = SessionClaims {
            sub: "not-a-number".to_string(),
            name: "Ada".to_string(),
            picture: None,
            iat: 0,
            exp: i64::MAX,
        };
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_token_without_picture() {
        let service = create_test_service();
        let token = service.issue(Snowflake::new(2), "Grace", None).unwrap();
        let claims = service.verify(&token).unwrap();
        assert!(claims.picture.is_none());
    }
}
