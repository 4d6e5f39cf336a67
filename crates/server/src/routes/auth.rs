//! Authentication route handlers.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use dronshop_core::{ContactType, Phone};

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::{Account, MeResponse};
use crate::services::auth::{AuthError, AuthService, Contact, TokenKind, TokenPair};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RequestCodeForm {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct RequestCodeResponse {
    pub sent: bool,
    /// Only present in dev mode.
    #[serde(rename = "debugCode", skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeForm {
    pub phone: String,
    #[serde(rename = "verificationCode")]
    pub verification_code: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPasswordForm {
    pub contact_type: String,
    pub contact_value: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPasswordForm {
    pub contact_type: String,
    pub contact_value: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DevLoginForm {
    pub login: String,
    pub password: String,
}

// =============================================================================
// Helpers
// =============================================================================

fn issue_tokens(state: &AppState, account: &Account) -> Result<Json<TokenPair>> {
    let pair = state.tokens().issue_pair(account.user.id, &account.roles)?;
    Ok(Json(pair))
}

fn parse_contact(contact_type: &str, contact_value: &str) -> Result<Contact> {
    let kind = contact_type
        .parse::<ContactType>()
        .map_err(AppError::BadRequest)?;
    Ok(Contact::parse(kind, contact_value)?)
}

/// Parse the phone and consume its verification code.
async fn verified_phone(state: &AppState, form: &VerifyCodeForm) -> Result<Phone> {
    let phone = Phone::parse(&form.phone).map_err(AuthError::from)?;
    if !state.sms().verify(&phone, &form.verification_code).await {
        return Err(AuthError::InvalidCode.into());
    }
    Ok(phone)
}

// =============================================================================
// SMS Code Flow
// =============================================================================

/// Issue a verification code for a phone number.
///
/// No SMS gateway is wired in: dev mode returns the code in the response,
/// otherwise it is written to the log.
#[instrument(skip(state, form))]
pub async fn request_code(
    State(state): State<AppState>,
    Json(form): Json<RequestCodeForm>,
) -> Result<Json<RequestCodeResponse>> {
    let phone = Phone::parse(&form.phone).map_err(AuthError::from)?;
    let code = state.sms().issue(&phone).await;

    let debug_code = if state.config().dev_mode() {
        Some(code)
    } else {
        info!(phone = %phone, code = %code, "Verification code issued");
        None
    };

    Ok(Json(RequestCodeResponse {
        sent: true,
        debug_code,
    }))
}

/// Register (or sign in) with a phone and a verification code.
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<VerifyCodeForm>,
) -> Result<Json<TokenPair>> {
    let phone = verified_phone(&state, &form).await?;
    let account = AuthService::new(state.pool()).register_by_phone(&phone).await?;
    issue_tokens(&state, &account)
}

/// Sign in an existing user with a phone and a verification code.
#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<VerifyCodeForm>,
) -> Result<Json<TokenPair>> {
    let phone = verified_phone(&state, &form).await?;
    let account = AuthService::new(state.pool()).login_by_phone(&phone).await?;
    info!(user_id = %account.user.id, "User logged in with code");
    issue_tokens(&state, &account)
}

// =============================================================================
// Tokens & Profile
// =============================================================================

/// Exchange a refresh token for a new pair.
#[instrument(skip(state, form))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(form): Json<RefreshForm>,
) -> Result<Json<TokenPair>> {
    let claims = state.tokens().verify(&form.refresh_token, TokenKind::Refresh)?;
    let account = AuthService::new(state.pool())
        .refresh_account(claims.user_id()?)
        .await?;
    issue_tokens(&state, &account)
}

/// Current user's profile and roles.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MeResponse>> {
    let account = AuthService::new(state.pool()).account(user.id).await?;
    Ok(Json(account.into()))
}

// =============================================================================
// Password Flow
// =============================================================================

#[instrument(skip(state, form), fields(contact_type = %form.contact_type))]
pub async fn register_password(
    State(state): State<AppState>,
    Json(form): Json<RegisterPasswordForm>,
) -> Result<Json<TokenPair>> {
    let contact = parse_contact(&form.contact_type, &form.contact_value)?;
    let account = AuthService::new(state.pool())
        .register_with_password(&contact, &form.password, &form.password_confirm)
        .await?;
    issue_tokens(&state, &account)
}

#[instrument(skip(state, form), fields(contact_type = %form.contact_type))]
pub async fn login_password(
    State(state): State<AppState>,
    Json(form): Json<LoginPasswordForm>,
) -> Result<Json<TokenPair>> {
    let contact = parse_contact(&form.contact_type, &form.contact_value)?;
    let account = AuthService::new(state.pool())
        .login_with_password(&contact, &form.password)
        .await?;
    info!(user_id = %account.user.id, "User logged in with password");
    issue_tokens(&state, &account)
}

/// Sign in as a fixed dev account. 404 unless dev login is enabled.
#[instrument(skip(state, form), fields(login = %form.login))]
pub async fn dev_login(
    State(state): State<AppState>,
    Json(form): Json<DevLoginForm>,
) -> Result<Json<TokenPair>> {
    let account = AuthService::new(state.pool())
        .dev_login(state.config().dev_login_enabled, &form.login, &form.password)
        .await?;
    issue_tokens(&state, &account)
}
