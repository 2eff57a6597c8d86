use axum::{
    extract::{Path, State},
    response::Response,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::to_json;
use crate::auth::{self, RESET_TOKEN_TTL_MINUTES};
use crate::database::models::user::PASSWORD_MIN_LENGTH;
use crate::database::models::{is_valid_email, present, FieldErrors, NewUser, UserChanges};
use crate::error::ApiError;
use crate::mail::MailMessage;
use crate::middleware::response::logout_response;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, TokenResponse};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

/// Name and email checks shared by registration and the admin user endpoints
pub(crate) fn check_identity(
    errors: &mut FieldErrors,
    name: &Option<String>,
    email: &Option<String>,
    required: bool,
) {
    if required || name.is_some() {
        errors.check(present(name), "name", "Please add a name");
    }
    if required || email.is_some() {
        errors.check(present(email), "email", "Please add an email");
    }
    if let Some(email) = email {
        errors.check(is_valid_email(email.trim()), "email", "Please add a valid email");
    }
}

pub(crate) fn check_password(errors: &mut FieldErrors, password: &Option<String>) {
    errors.check(present(password), "password", "Please add a password");
    errors.check(
        password
            .as_deref()
            .map(|p| p.chars().count() >= PASSWORD_MIN_LENGTH)
            .unwrap_or(true),
        "password",
        format!("Password must be at least {} characters", PASSWORD_MIN_LENGTH),
    );
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn token_response(state: &AppState, user_id: uuid::Uuid) -> Result<TokenResponse, ApiError> {
    let token = auth::issue_token(user_id, &state.config.security)?;
    Ok(TokenResponse::new(token, &state.config.security))
}

/// POST /api/v1/auth/register - Create an account and sign in
///
/// Self-registration may pick `user` (default) or `publisher`; admins are
/// created through the user management endpoints.
///
/// ```json
/// {"name": "John Doe", "email": "john@gmail.com", "password": "123456", "role": "publisher"}
/// ```
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<TokenResponse, ApiError> {
    let mut errors = FieldErrors::new();
    check_identity(&mut errors, &body.name, &body.email, true);
    check_password(&mut errors, &body.password);
    let role = match body.role.as_deref() {
        None => Some(Role::User),
        Some(raw) => raw.parse::<Role>().ok().filter(|r| !r.is_admin()),
    };
    errors.check(role.is_some(), "role", "Role must be user or publisher");
    errors.finish()?;

    let password_hash =
        auth::hash_password(body.password.unwrap_or_default(), state.config.security.bcrypt_cost).await?;
    let user = state
        .store
        .create_user(NewUser {
            name: body.name.unwrap_or_default().trim().to_string(),
            email: normalize_email(&body.email.unwrap_or_default()),
            role: role.unwrap_or_default(),
            password_hash,
        })
        .await?;

    tracing::info!("Registered user {} as {}", user.id, user.role);
    token_response(&state, user.id)
}

/// POST /api/v1/auth/login - Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<TokenResponse, ApiError> {
    let (Some(email), Some(password)) = (
        body.email.filter(|e| !e.trim().is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let invalid = || ApiError::unauthorized("Invalid credentials");
    let user = state
        .store
        .find_user_by_email(&normalize_email(&email))
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(password, user.password_hash.clone()).await? {
        tracing::debug!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    token_response(&state, user.id)
}

/// GET /api/v1/auth/logout - Clear the token cookie
pub async fn logout(State(state): State<AppState>) -> Response {
    logout_response(&state.config.security)
}

/// GET /api/v1/auth/me - The signed-in user
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let user = state
        .store
        .find_user(user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;
    Ok(ApiResponse::success(to_json(&user)?))
}

/// PUT /api/v1/auth/updatedetails - Change own name or email
pub async fn update_details(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<UpdateDetailsRequest>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    check_identity(&mut errors, &body.name, &body.email, false);
    errors.finish()?;

    let changes = UserChanges {
        name: body.name.map(|n| n.trim().to_string()),
        email: body.email.as_deref().map(normalize_email),
        role: None,
    };
    let updated = state.store.update_user(user.id, changes).await?;
    Ok(ApiResponse::success(to_json(&updated)?))
}

/// PUT /api/v1/auth/updatepassword - Change own password, returns a fresh token
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> Result<TokenResponse, ApiError> {
    let current = state
        .store
        .find_user(user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    let supplied = body.current_password.unwrap_or_default();
    if !auth::verify_password(supplied, current.password_hash).await? {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    let mut errors = FieldErrors::new();
    check_password(&mut errors, &body.new_password);
    errors.finish()?;

    let password_hash = auth::hash_password(
        body.new_password.unwrap_or_default(),
        state.config.security.bcrypt_cost,
    )
    .await?;
    state.store.set_password(user.id, password_hash).await?;
    token_response(&state, user.id)
}

/// POST /api/v1/auth/forgotpassword - Email a single-use reset link
///
/// The link carries the raw token; only its sha256 digest is stored, valid for
/// ten minutes. When delivery fails the token is withdrawn again.
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ForgotPasswordRequest>,
) -> ApiResult<String> {
    let email = normalize_email(&body.email.unwrap_or_default());
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

    let (token, hashed) = auth::generate_reset_token();
    let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    state.store.set_reset_token(user.id, Some((hashed, expires))).await?;

    let url = reset_url(&state.config.server.public_base_url, &token);
    let message = MailMessage {
        to: user.email.clone(),
        subject: "Password reset token".to_string(),
        text: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. Please make a PUT request to: \n\n {}",
            url
        ),
    };

    if let Err(e) = state.mailer.send(message).await {
        state.store.set_reset_token(user.id, None).await?;
        return Err(e.into());
    }

    Ok(ApiResponse::success("Email sent".to_string()))
}

/// PUT /api/v1/auth/resetpassword/:resettoken - Set a new password with a reset token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<TokenResponse, ApiError> {
    let hashed = auth::hash_reset_token(&reset_token);
    let user = state
        .store
        .find_user_by_reset_token(&hashed, Utc::now())
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    let mut errors = FieldErrors::new();
    check_password(&mut errors, &body.password);
    errors.finish()?;

    let password_hash =
        auth::hash_password(body.password.unwrap_or_default(), state.config.security.bcrypt_cost).await?;
    state.store.set_password(user.id, password_hash).await?;

    tracing::info!("Password reset for user {}", user.id);
    token_response(&state, user.id)
}

/// Link mailed to the user; request headers never contribute to it
fn reset_url(base: &str, token: &str) -> String {
    format!(
        "{}/api/v1/auth/resetpassword/{}",
        base.trim_end_matches('/'),
        token
    )
}
