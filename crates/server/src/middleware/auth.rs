//! Bearer token extractors.
//!
//! Handlers take one of these as an argument to declare their auth needs:
//!
//! ```rust,ignore
//! async fn me(RequireAuth(user): RequireAuth) -> impl IntoResponse { ... }
//! async fn admin_only(RequireAdmin(user): RequireAdmin) -> impl IntoResponse { ... }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use dronshop_core::{UserId, roles};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::TokenKind;
use crate::state::AppState;

/// Identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub roles: Vec<String>,
}

impl AuthUser {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(token) = bearer_token(parts) else {
        return Ok(None);
    };

    let claims = state.tokens().verify(token, TokenKind::Access)?;
    let user = AuthUser {
        id: claims.user_id()?,
        roles: claims.roles().to_vec(),
    };
    set_sentry_user(&user.id);
    Ok(Some(user))
}

/// Requires a valid access token; 401 otherwise.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Requires a valid access token carrying the `admin` role; 401 or 403.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.has_role(roles::ADMIN) {
            return Err(AppError::Forbidden("Forbidden".to_string()));
        }
        Ok(Self(user))
    }
}

/// The caller if a valid access token is present. Invalid tokens count as anonymous.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state).ok().flatten()))
    }
}
