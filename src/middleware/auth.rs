use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use super::response::TOKEN_COOKIE;
use crate::auth::validate_jwt;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Authenticated user loaded by `protect`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))
    }
}

/// Verifies the bearer token (or `token` cookie) and loads the current user
pub async fn protect(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or_else(|| {
        tracing::debug!("Request without credentials to {}", request.uri().path());
        ApiError::unauthorized(NOT_AUTHORIZED)
    })?;

    let claims = validate_jwt(&token, &state.config.security.jwt_secret)?;

    let user = state.store.find_user(claims.id).await?.ok_or_else(|| {
        tracing::warn!("Token for unknown user {}", claims.id);
        ApiError::unauthorized(NOT_AUTHORIZED)
    })?;

    request.extensions_mut().insert(AuthUser::from(&user));
    Ok(next.run(request).await)
}

/// Role gate for admin-only routers; must run after `protect`
pub async fn admin_only(user: AuthUser, request: Request, next: Next) -> Result<Response, ApiError> {
    crate::policy::require_role(&user, &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header, else the session cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    let jar = CookieJar::from_headers(headers);
    let value = jar.get(TOKEN_COOKIE)?.value_trimmed();
    match value {
        "" | "none" => None,
        token => Some(token.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        let mut logged_out = HeaderMap::new();
        logged_out.insert(header::COOKIE, HeaderValue::from_static("token=none"));
        assert_eq!(extract_token(&logged_out), None);
    }

    #[test]
    fn quoted_cookie_value_is_unwrapped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token=\"abc.def.ghi\""));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn malformed_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(extract_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers), None);
    }
}
