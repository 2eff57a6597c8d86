//! Admin-only user management. The router puts `protect` and `admin_only`
//! in front of every route here.

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::auth::{check_identity, check_password, normalize_email};
use super::{list_response, parse_list, project, to_json};
use crate::auth;
use crate::database::models::{user, FieldErrors, NewUser, User, UserChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, IdPath, JsonBody, ListParams};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct UserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UserBody {
    fn role(&self, errors: &mut FieldErrors) -> Option<Role> {
        let role = self.role.as_deref().map(str::parse::<Role>);
        errors.check(
            !matches!(role, Some(Err(_))),
            "role",
            "Role must be user, publisher or admin",
        );
        role.and_then(Result::ok)
    }
}

/// GET /api/v1/users - List users with advanced results
pub async fn get_users(
    State(state): State<AppState>,
    params: ListParams,
) -> ApiResult<Vec<Value>> {
    let query = parse_list(&state, &user::FIELDS, &params)?;
    let page = state.store.list_users(&query).await?;
    let items = page
        .items
        .iter()
        .map(|u| Ok(project(to_json(u)?, query.select.as_deref())))
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(list_response(items, &query, page.total))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    let user = find(&state, id).await?;
    Ok(ApiResponse::success(to_json(&user)?))
}

/// POST /api/v1/users - Create a user with any role
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UserBody>,
) -> ApiResult<Value> {
    let mut errors = FieldErrors::new();
    check_identity(&mut errors, &body.name, &body.email, true);
    check_password(&mut errors, &body.password);
    let role = body.role(&mut errors);
    errors.finish()?;

    let password_hash =
        auth::hash_password(body.password.unwrap_or_default(), state.config.security.bcrypt_cost).await?;
    let created = state
        .store
        .create_user(NewUser {
            name: body.name.unwrap_or_default().trim().to_string(),
            email: normalize_email(&body.email.unwrap_or_default()),
            role: role.unwrap_or_default(),
            password_hash,
        })
        .await?;
    Ok(ApiResponse::created(to_json(&created)?))
}

/// PUT /api/v1/users/:id - Change name, email or role
pub async fn update_user(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<UserBody>,
) -> ApiResult<Value> {
    find(&state, id).await?;

    let mut errors = FieldErrors::new();
    check_identity(&mut errors, &body.name, &body.email, false);
    let role = body.role(&mut errors);
    errors.finish()?;

    let changes = UserChanges {
        name: body.name.map(|n| n.trim().to_string()),
        email: body.email.as_deref().map(normalize_email),
        role,
    };
    let updated = state.store.update_user(id, changes).await?;
    Ok(ApiResponse::success(to_json(&updated)?))
}

/// DELETE /api/v1/users/:id - Delete a user and everything they own
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthUser,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    find(&state, id).await?;
    state.store.delete_user(id).await?;
    tracing::info!("Admin {} deleted user {}", admin.id, id);
    Ok(ApiResponse::success(Value::Object(Default::default())))
}

async fn find(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No user with the id of {}", id)))
}
