pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

use std::collections::HashMap;

use crate::error::ApiError;

pub use bootcamp::{Bootcamp, BootcampChanges, BootcampSummary, Location, NewBootcamp};
pub use course::{Course, CourseChanges, MinimumSkill, NewCourse};
pub use review::{NewReview, Review, ReviewChanges};
pub use user::{NewUser, User, UserChanges};

/// Field-level validation problems collected at the request boundary
#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok`; the first problem per field wins.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok && !self.0.contains_key(field) {
            self.0.insert(field.to_string(), message.into());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::from_field_errors(self.0))
        }
    }
}

/// Loose address check: something@something.tld, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .rsplit_once('.')
            .map(|(host, tld)| !host.is_empty() && tld.len() >= 2)
            .unwrap_or(false)
}

/// Required text: present and not blank
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}
