//! Token service — issues, verifies, rotates and revokes JWT pairs.
//!
//! Exactly one refresh token per user is trusted at a time: issuing a pair
//! overwrites the per-user record in the token cache, and a refresh call
//! must present the token currently on record. Concurrent refreshes for the
//! same user race at the store; the loser's stale token is simply rejected
//! on its next use.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{DomainError, DomainResult, User, UserRepositoryInterface};
use crate::infrastructure::cache::TokenCache;
use crate::infrastructure::crypto::jwt::{
    create_token, verify_token, JwtConfig, TokenClaims, TokenKind,
};

/// Access + refresh token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Cache key holding the single trusted refresh token for a user.
pub fn refresh_key(user_id: i32) -> String {
    format!("refresh_token:{user_id}")
}

/// Cache key marking an access token as revoked until its natural expiry.
pub fn blacklist_key(token: &str) -> String {
    format!("blacklist:{token}")
}

pub struct TokenService<R: UserRepositoryInterface> {
    repo: Arc<R>,
    cache: Option<Arc<dyn TokenCache>>,
    jwt: JwtConfig,
}

impl<R: UserRepositoryInterface> TokenService<R> {
    pub fn new(repo: Arc<R>, cache: Option<Arc<dyn TokenCache>>, jwt: JwtConfig) -> Self {
        Self { repo, cache, jwt }
    }

    /// Issue a signed access/refresh pair for a user and persist the refresh
    /// token under the per-user key, superseding any earlier one. The cache
    /// write is best-effort.
    pub async fn issue(&self, user: &User) -> DomainResult<TokenPair> {
        let role = user.role.as_str();

        let access_token = create_token(
            &user.username,
            user.id,
            role,
            &user.email,
            TokenKind::Access,
            &self.jwt,
        )
        .map_err(|e| DomainError::Internal(format!("failed to sign access token: {e}")))?;

        let refresh_token = create_token(
            &user.username,
            user.id,
            role,
            &user.email,
            TokenKind::Refresh,
            &self.jwt,
        )
        .map_err(|e| DomainError::Internal(format!("failed to sign refresh token: {e}")))?;

        if let Some(cache) = &self.cache {
            let ttl = (self.jwt.refresh_token_days * 24 * 3600) as u64;
            if let Err(e) = cache.set_ex(&refresh_key(user.id), &refresh_token, ttl).await {
                debug!(user_id = user.id, "could not persist refresh token: {e}");
            }
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt.access_token_minutes * 60,
        })
    }

    /// Verify signature, expiry and kind. Does not consult the blacklist.
    pub fn verify(&self, token: &str, kind: TokenKind) -> DomainResult<TokenClaims> {
        verify_token(token, kind, &self.jwt)
            .map_err(|_| DomainError::Unauthorized("Invalid token".to_string()))
    }

    /// Exchange a refresh token for a fresh pair (single-use rotation).
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let claims = verify_token(refresh_token, TokenKind::Refresh, &self.jwt)
            .map_err(|_| DomainError::Unauthorized("Invalid refresh token".to_string()))?;

        // The presented token must be the one on record. A missing record
        // (revoked session or already-rotated token) rejects; an unreachable
        // cache skips the check rather than blocking every refresh.
        if let Some(cache) = &self.cache {
            match cache.get(&refresh_key(claims.user_id)).await {
                Ok(stored) => {
                    if stored.as_deref() != Some(refresh_token) {
                        return Err(DomainError::Unauthorized(
                            "Invalid refresh token".to_string(),
                        ));
                    }
                }
                Err(e) => debug!("token cache unreachable, skipping rotation check: {e}"),
            }
        }

        let user = self
            .repo
            .get_user_by_id(claims.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| DomainError::Unauthorized("User not found or inactive".to_string()))?;

        self.issue(&user).await
    }

    /// Blacklist an access token for the remainder of its lifetime. The
    /// record self-expires when the token would have expired anyway.
    pub async fn revoke_access(&self, access_token: &str) {
        let Some(cache) = &self.cache else { return };

        let Ok(claims) = verify_token(access_token, TokenKind::Access, &self.jwt) else {
            return;
        };

        let ttl = claims.remaining_secs();
        if ttl <= 0 {
            return;
        }

        if let Err(e) = cache
            .set_ex(&blacklist_key(access_token), "true", ttl as u64)
            .await
        {
            debug!("could not blacklist access token: {e}");
        }
    }

    /// Drop the stored refresh token for a user, forcing a fresh login.
    pub async fn revoke_session(&self, user_id: i32) {
        let Some(cache) = &self.cache else { return };

        if let Err(e) = cache.del(&refresh_key(user_id)).await {
            debug!(user_id, "could not drop refresh token: {e}");
        } else {
            info!(user_id, "Refresh session revoked");
        }
    }
}
