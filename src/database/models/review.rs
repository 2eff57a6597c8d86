use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec};

pub const TITLE_MAX_LENGTH: usize = 100;
pub const RATING_RANGE: std::ops::RangeInclusive<i16> = 1..=10;

/// Filterable and sortable review fields
pub static FIELDS: [FieldSpec; 6] = [
    FieldSpec::new("title", "title", FieldKind::Text),
    FieldSpec::new("text", "text", FieldKind::Text),
    FieldSpec::new("rating", "rating", FieldKind::Integer),
    FieldSpec::new("bootcamp", "bootcamp_id", FieldKind::Uuid),
    FieldSpec::new("user", "user_id", FieldKind::Uuid),
    FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn from_new(id: Uuid, new: NewReview, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            bootcamp_id: new.bootcamp_id,
            user_id: new.user_id,
            title: new.title,
            text: new.text,
            rating: new.rating,
            created_at,
        }
    }

    pub fn apply(&mut self, changes: ReviewChanges) {
        if let Some(v) = changes.title {
            self.title = v;
        }
        if let Some(v) = changes.text {
            self.text = v;
        }
        if let Some(v) = changes.rating {
            self.rating = v;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i16,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i16>,
}
