//! JWT access and refresh tokens (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dronshop_core::UserId;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Malformed,

    /// An access token was presented where a refresh token was expected, or
    /// the other way round.
    #[error("invalid token type")]
    WrongType,

    #[error("token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),

    /// `exp` would fall outside the representable date range.
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,
}

/// Value of the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload. Refresh tokens carry no `roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The user id in `sub`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if `sub` is not a numeric id.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Malformed)
    }

    /// Role names, empty for refresh tokens.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.roles.as_deref().unwrap_or_default()
    }
}

/// `{accessToken, refreshToken}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            access_ttl: Duration::try_minutes(access_ttl_minutes).unwrap_or(Duration::MAX),
            refresh_ttl: Duration::try_days(refresh_ttl_days).unwrap_or(Duration::MAX),
        }
    }

    /// Issue a fresh access/refresh pair.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails, or
    /// `TokenError::LifetimeOutOfRange` if a lifetime overflows the clock.
    pub fn issue_pair(&self, user_id: UserId, roles: &[String]) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.sign(user_id, Some(roles.to_vec()), TokenKind::Access)?,
            refresh_token: self.sign(user_id, None, TokenKind::Refresh)?,
        })
    }

    fn sign(
        &self,
        user_id: UserId,
        roles: Option<Vec<String>>,
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let claims = Claims {
            sub: user_id.to_string(),
            roles,
            kind,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encoding)
    }

    /// Decode `token`, check signature and expiry, and require `expected` type.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::Malformed` or `TokenError::WrongType`.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.kind != expected {
            return Err(TokenError::WrongType);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            &SecretString::from("k7Qz!pR2#vX9@mL4$wN8^bT1&cY6*hJ3"),
            15,
            14,
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let pair = tokens
            .issue_pair(UserId::new(5), &["admin".to_string()])
            .unwrap();

        let claims = tokens.verify(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(5));
        assert_eq!(claims.roles(), ["admin".to_string()]);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_refresh_token_has_no_roles() {
        let tokens = service();
        let pair = tokens.issue_pair(UserId::new(5), &[]).unwrap();
        let claims = tokens.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert!(claims.roles.is_none());
        assert_eq!(claims.exp - claims.iat, 14 * 24 * 60 * 60);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let tokens = service();
        let pair = tokens.issue_pair(UserId::new(5), &[]).unwrap();
        assert!(matches!(
            tokens.verify(&pair.refresh_token, TokenKind::Access),
            Err(TokenError::WrongType)
        ));
    }

    #[test]
    fn test_expired_token() {
        let tokens = TokenService::new(
            &SecretString::from("k7Qz!pR2#vX9@mL4$wN8^bT1&cY6*hJ3"),
            -5,
            14,
        );
        let pair = tokens.issue_pair(UserId::new(5), &[]).unwrap();
        assert!(matches!(
            tokens.verify(&pair.access_token, TokenKind::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_huge_lifetime_fails_without_panicking() {
        let secret = SecretString::from("k7Qz!pR2#vX9@mL4$wN8^bT1&cY6*hJ3");

        let tokens = TokenService::new(&secret, i64::MAX, 14);
        assert!(matches!(
            tokens.issue_pair(UserId::new(5), &[]),
            Err(TokenError::LifetimeOutOfRange)
        ));

        let tokens = TokenService::new(&secret, 15, 1_000_000_000);
        assert!(matches!(
            tokens.issue_pair(UserId::new(5), &[]),
            Err(TokenError::LifetimeOutOfRange)
        ));
    }

    #[test]
    fn test_foreign_signature_is_malformed() {
        let other = TokenService::new(
            &SecretString::from("another-secret-with-enough-length-0123"),
            15,
            14,
        );
        let pair = other.issue_pair(UserId::new(5), &[]).unwrap();
        assert!(matches!(
            service().verify(&pair.access_token, TokenKind::Access),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            service().verify("not-a-jwt", TokenKind::Access),
            Err(TokenError::Malformed)
        ));
    }
}
