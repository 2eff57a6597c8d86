use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Strips operator-like keys (`$where`, `a.b`) and HTML-escapes angle
/// brackets in string values of JSON request bodies. Passwords are left as
/// typed since they are only hashed or compared.
pub async fn sanitize_json_body(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !is_json(&request) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, state.config.api.max_request_size_bytes)
        .await
        .map_err(|_| ApiError::bad_request("Request body is too large"))?;

    let bytes: Bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            sanitize(&mut value);
            parts.headers.remove(header::CONTENT_LENGTH);
            serde_json::to_vec(&value)
                .map_err(|e| ApiError::internal_server_error(format!("Failed to re-encode body: {}", e)))?
                .into()
        }
        // Let the Json extractor report malformed bodies
        Err(_) => bytes,
    };

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

const PASSWORD_KEYS: [&str; 3] = ["password", "currentPassword", "newPassword"];

pub fn sanitize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.starts_with('$') && !key.contains('.'));
            for (key, item) in map.iter_mut() {
                if item.is_string() && PASSWORD_KEYS.contains(&key.as_str()) {
                    continue;
                }
                sanitize(item);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize),
        Value::String(s) => {
            if s.contains(['<', '>']) {
                *s = s.replace('<', "&lt;").replace('>', "&gt;");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removes_operator_keys_recursively() {
        let mut body = json!({
            "email": {"$gt": ""},
            "name": "Jane",
            "profile.admin": true,
            "nested": [{"$where": "1", "ok": 1}]
        });
        sanitize(&mut body);
        assert_eq!(body, json!({"email": {}, "name": "Jane", "nested": [{"ok": 1}]}));
    }

    #[test]
    fn escapes_markup() {
        let mut body = json!({"description": "<script>alert(1)</script>", "n": 5});
        sanitize(&mut body);
        assert_eq!(
            body,
            json!({"description": "&lt;script&gt;alert(1)&lt;/script&gt;", "n": 5})
        );
    }

    #[test]
    fn passwords_keep_markup() {
        let mut body = json!({
            "name": "<b>Jane</b>",
            "password": "p<a>ss",
            "currentPassword": "<old>",
            "newPassword": "<new>",
            "nested": {"password": {"$ne": ""}}
        });
        sanitize(&mut body);
        assert_eq!(
            body,
            json!({
                "name": "&lt;b&gt;Jane&lt;/b&gt;",
                "password": "p<a>ss",
                "currentPassword": "<old>",
                "newPassword": "<new>",
                "nested": {"password": {}}
            })
        );
    }
}
