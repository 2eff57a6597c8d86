use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec};
use crate::types::Role;

pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Filterable and sortable user fields
pub static FIELDS: [FieldSpec; 4] = [
    FieldSpec::new("name", "name", FieldKind::Text),
    FieldSpec::new("email", "email", FieldKind::Text),
    FieldSpec::new("role", "role", FieldKind::Text),
    FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub reset_password_token: Option<String>,
    #[serde(skip)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True when `hash` is the stored reset token hash and it has not expired at `now`
    pub fn reset_token_matches(&self, hash: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_password_token, self.reset_password_expire) {
            (Some(stored), Some(expire)) => stored == hash && expire > now,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Partial update; `None` leaves the stored value unchanged
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}
