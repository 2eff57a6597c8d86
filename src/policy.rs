//! Ownership and role checks applied before mutating operations.
//!
//! The acting user may mutate a resource when they own it or are an admin.
//! Mismatches are reported with `ApiError::Forbidden`, which renders as 401.

use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::types::{Operation, ResourceKind, Role};

pub fn is_allowed(owner_id: Uuid, actor: &AuthUser) -> bool {
    actor.id == owner_id || actor.role.is_admin()
}

pub fn ensure_owner(
    owner_id: Uuid,
    actor: &AuthUser,
    operation: Operation,
    kind: ResourceKind,
) -> Result<(), ApiError> {
    if is_allowed(owner_id, actor) {
        return Ok(());
    }
    tracing::warn!(
        "User {} ({}) denied {:?} on {} owned by {}",
        actor.id,
        actor.role,
        operation,
        kind,
        owner_id
    );
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {} this {}",
        actor.id,
        operation.verb(),
        kind
    )))
}

/// Non-admins may publish one bootcamp; `existing` is the actor's current bootcamp, if any
pub fn ensure_can_create_bootcamp(existing: Option<Uuid>, actor: &AuthUser) -> Result<(), ApiError> {
    match existing {
        Some(_) if !actor.role.is_admin() => Err(ApiError::bad_request(format!(
            "The user with ID {} has already published a bootcamp",
            actor.id
        ))),
        _ => Ok(()),
    }
}

pub fn require_role(actor: &AuthUser, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&actor.role) {
        return Ok(());
    }
    Err(ApiError::forbidden(format!(
        "User role {} is not authorized to access this route",
        actor.role
    )))
}
