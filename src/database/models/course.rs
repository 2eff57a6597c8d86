use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec};

/// Filterable and sortable course fields
pub static FIELDS: [FieldSpec; 9] = [
    FieldSpec::new("title", "title", FieldKind::Text),
    FieldSpec::new("description", "description", FieldKind::Text),
    FieldSpec::new("weeks", "weeks", FieldKind::Text),
    FieldSpec::new("tuition", "tuition", FieldKind::Number),
    FieldSpec::new("minimumSkill", "minimum_skill", FieldKind::Text),
    FieldSpec::new("scholarshipAvailable", "scholarship_available", FieldKind::Boolean),
    FieldSpec::new("bootcamp", "bootcamp_id", FieldKind::Uuid),
    FieldSpec::new("user", "user_id", FieldKind::Uuid),
    FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

impl MinimumSkill {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinimumSkill::Beginner => "beginner",
            MinimumSkill::Intermediate => "intermediate",
            MinimumSkill::Advanced => "advanced",
        }
    }
}

impl fmt::Display for MinimumSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinimumSkill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(MinimumSkill::Beginner),
            "intermediate" => Ok(MinimumSkill::Intermediate),
            "advanced" => Ok(MinimumSkill::Advanced),
            other => Err(format!("Unknown minimum skill: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub tuition: Decimal,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn from_new(id: Uuid, new: NewCourse, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            bootcamp_id: new.bootcamp_id,
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            weeks: new.weeks,
            tuition: new.tuition,
            minimum_skill: new.minimum_skill,
            scholarship_available: new.scholarship_available,
            created_at,
        }
    }

    pub fn apply(&mut self, changes: CourseChanges) {
        if let Some(v) = changes.title {
            self.title = v;
        }
        if let Some(v) = changes.description {
            self.description = v;
        }
        if let Some(v) = changes.weeks {
            self.weeks = v;
        }
        if let Some(v) = changes.tuition {
            self.tuition = v;
        }
        if let Some(v) = changes.minimum_skill {
            self.minimum_skill = v;
        }
        if let Some(v) = changes.scholarship_available {
            self.scholarship_available = v;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: Decimal,
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub tuition: Option<Decimal>,
    pub minimum_skill: Option<MinimumSkill>,
    pub scholarship_available: Option<bool>,
}
