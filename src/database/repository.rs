use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    Bootcamp, BootcampChanges, Course, CourseChanges, NewBootcamp, NewCourse, NewReview, NewUser,
    Review, ReviewChanges, User, UserChanges,
};
use super::StoreError;
use crate::filter::{ListQuery, Page};
use crate::geo::Coordinates;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// User whose stored reset hash equals `token_hash` and has not expired at `now`
    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;
    async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, StoreError>;
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError>;
    /// Replace the password hash and clear any pending reset token
    async fn set_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<(String, DateTime<Utc>)>,
    ) -> Result<(), StoreError>;
    /// Removes the user together with their bootcamps, courses and reviews
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BootcampStore: Send + Sync {
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError>;
    async fn find_bootcamp_by_owner(&self, user_id: Uuid) -> Result<Option<Bootcamp>, StoreError>;
    async fn find_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError>;
    async fn list_bootcamps(&self, query: &ListQuery) -> Result<Page<Bootcamp>, StoreError>;
    /// Bootcamps whose location lies inside the spherical cap around `center`
    async fn bootcamps_within(
        &self,
        center: Coordinates,
        angular_radius: f64,
    ) -> Result<Vec<Bootcamp>, StoreError>;
    async fn create_bootcamp(&self, new: NewBootcamp) -> Result<Bootcamp, StoreError>;
    async fn update_bootcamp(&self, id: Uuid, changes: BootcampChanges) -> Result<Bootcamp, StoreError>;
    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<(), StoreError>;
    /// Removes the bootcamp together with its courses and reviews
    async fn delete_bootcamp(&self, id: Uuid) -> Result<(), StoreError>;
    async fn refresh_average_cost(&self, bootcamp_id: Uuid) -> Result<(), StoreError>;
    async fn refresh_average_rating(&self, bootcamp_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;
    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, StoreError>;
    async fn courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Course>, StoreError>;
    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError>;
    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError>;
    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> Result<Course, StoreError>;
    async fn delete_course(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError>;
    async fn list_reviews(&self, query: &ListQuery) -> Result<Page<Review>, StoreError>;
    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError>;
    /// Fails with `StoreError::Duplicate` when the user already reviewed the bootcamp
    async fn create_review(&self, new: NewReview) -> Result<Review, StoreError>;
    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> Result<Review, StoreError>;
    async fn delete_review(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Everything the handlers need from persistence
#[async_trait]
pub trait Store: UserStore + BootcampStore + CourseStore + ReviewStore {
    /// Connectivity check for the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;
    /// Remove every record of every collection
    async fn destroy_all(&self) -> Result<(), StoreError>;
}

pub(crate) fn not_found(kind: &str, id: Uuid) -> StoreError {
    StoreError::NotFound(format!("{} not found with id of {}", kind, id))
}
