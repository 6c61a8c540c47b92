//! JWT token handling
//!
//! Both access and refresh tokens are HS256-signed and self-contained: the
//! claims carry everything the session guard needs, so the database is only
//! consulted once per request (to load the user) and the token cache only
//! at login/refresh/logout time.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token lifetime in minutes
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_days: i64,
    /// Issuer claim
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            access_token_minutes: 30,
            refresh_token_days: 7,
            issuer: "pganalytics".to_string(),
        }
    }
}

/// Discriminates access tokens from refresh tokens; serialized into the
/// `type` claim so one kind can never be presented as the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("wrong token type: expected {expected}")]
    WrongKind { expected: TokenKind },
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// User ID
    pub user_id: i32,
    /// User role
    pub role: String,
    /// User email
    pub email: String,
    /// Token kind
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id, so two tokens minted in the same second still differ
    pub jti: String,
}

impl TokenClaims {
    pub fn new(
        username: &str,
        user_id: i32,
        role: &str,
        email: &str,
        kind: TokenKind,
        config: &JwtConfig,
    ) -> Self {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => Duration::minutes(config.access_token_minutes),
            TokenKind::Refresh => Duration::days(config.refresh_token_days),
        };

        Self {
            sub: username.to_string(),
            user_id,
            role: role.to_string(),
            email: email.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Seconds until this token's natural expiry (negative if already past).
    pub fn remaining_secs(&self) -> i64 {
        self.exp - Utc::now().timestamp()
    }
}

/// Create a signed token of the given kind for a user
pub fn create_token(
    username: &str,
    user_id: i32,
    role: &str,
    email: &str,
    kind: TokenKind,
    config: &JwtConfig,
) -> Result<String, TokenError> {
    let claims = TokenClaims::new(username, user_id, role, email, kind, config);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(TokenError::from)
}

/// Verify signature, expiry, issuer and kind, and decode the claims
pub fn verify_token(
    token: &str,
    expected: TokenKind,
    config: &JwtConfig,
) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    if token_data.claims.kind != expected {
        return Err(TokenError::WrongKind { expected });
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        }
    }

    #[test]
    fn creates_and_verifies_access_token() {
        let config = config();
        let token =
            create_token("alice", 7, "viewer", "alice@example.com", TokenKind::Access, &config)
                .unwrap();

        let claims = verify_token(&token, TokenKind::Access, &config).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, "viewer");
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.remaining_secs() > 0);
    }

    #[test]
    fn refresh_token_is_not_accepted_as_access() {
        let config = config();
        let token =
            create_token("alice", 7, "viewer", "alice@example.com", TokenKind::Refresh, &config)
                .unwrap();

        let err = verify_token(&token, TokenKind::Access, &config).unwrap_err();
        assert!(matches!(err, TokenError::WrongKind { .. }));
        assert!(verify_token(&token, TokenKind::Refresh, &config).is_ok());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let config = config();
        let other = JwtConfig {
            secret: "other-secret".to_string(),
            ..JwtConfig::default()
        };
        let token =
            create_token("alice", 7, "viewer", "alice@example.com", TokenKind::Access, &other)
                .unwrap();

        assert!(verify_token(&token, TokenKind::Access, &config).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(verify_token("not-a-token", TokenKind::Access, &config()).is_err());
    }

    #[test]
    fn tokens_minted_back_to_back_differ() {
        let config = config();
        let a = create_token("alice", 7, "viewer", "a@example.com", TokenKind::Refresh, &config)
            .unwrap();
        let b = create_token("alice", 7, "viewer", "a@example.com", TokenKind::Refresh, &config)
            .unwrap();
        assert_ne!(a, b);
    }
}
