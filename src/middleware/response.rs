use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use serde_json::{json, Map, Value};
use time::{Duration, OffsetDateTime};

use crate::config::SecurityConfig;
use crate::filter::Pagination;

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
    pub count: Option<usize>,
    pub pagination: Option<Pagination>,
    pub total: Option<u64>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
            count: None,
            pagination: None,
            total: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            status_code: Some(StatusCode::CREATED),
            ..Self::success(data)
        }
    }

    /// Adds `count` (number of items in `data`)
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Adds `count`, `pagination` and `total` for list endpoints
    pub fn paginated(data: T, count: usize, pagination: Pagination, total: u64) -> Self {
        Self {
            count: Some(count),
            pagination: Some(pagination),
            total: Some(total),
            ..Self::success(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        // Convert data to JSON Value for consistent envelope format
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        let mut envelope = Map::new();
        envelope.insert("success".into(), Value::Bool(true));
        if let Some(count) = self.count {
            envelope.insert("count".into(), json!(count));
        }
        if let Some(pagination) = self.pagination {
            envelope.insert("pagination".into(), json!(pagination));
        }
        if let Some(total) = self.total {
            envelope.insert("total".into(), json!(total));
        }
        envelope.insert("data".into(), data_value);

        (status, Json(Value::Object(envelope))).into_response()
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

pub const TOKEN_COOKIE: &str = "token";

/// `{success, token}` plus the session cookie
#[derive(Debug)]
pub struct TokenResponse {
    token: String,
    cookie: Cookie<'static>,
}

impl TokenResponse {
    pub fn new(token: String, security: &SecurityConfig) -> Self {
        let expires = OffsetDateTime::now_utc() + Duration::days(security.cookie_expiry_days);
        let cookie = session_cookie(token.clone(), expires, security.secure_cookies);
        Self { token, cookie }
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        let jar = CookieJar::new().add(self.cookie);
        (jar, Json(json!({ "success": true, "token": self.token }))).into_response()
    }
}

/// Response of logout: `{success, data: {}}` and an immediately expiring cookie
pub fn logout_response(security: &SecurityConfig) -> Response {
    let cookie = session_cookie(
        "none".to_string(),
        OffsetDateTime::now_utc() + Duration::seconds(10),
        security.secure_cookies,
    );
    let jar = CookieJar::new().add(cookie);
    (jar, Json(json!({ "success": true, "data": {} }))).into_response()
}

fn session_cookie(value: String, expires: OffsetDateTime, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .http_only(true)
        .expires(expires)
        .secure(secure)
        .build()
}
