//! In-process collaborators for tests: a `Store` kept in memory, a geocoder
//! backed by a fixed table and a mailer that records what it would send.
//!
//! The memory store mirrors the PostgreSQL schema rules that handlers rely
//! on: unique user emails and bootcamp names, one review per user and
//! bootcamp, cascading deletes and recomputed bootcamp averages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::bootcamp::{average_cost, average_rating};
use crate::database::models::{
    Bootcamp, BootcampChanges, Course, CourseChanges, NewBootcamp, NewCourse, NewReview, NewUser,
    Review, ReviewChanges, User, UserChanges,
};
use crate::database::repository::not_found;
use crate::database::{BootcampStore, CourseStore, ReviewStore, Store, StoreError, UserStore};
use crate::filter::{Filter, ListQuery, Page};
use crate::geo::{self, Coordinates};
use crate::geocoder::{GeocodeError, GeocodedLocation, Geocoder};
use crate::mail::{MailError, MailMessage, Mailer};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    bootcamps: Vec<Bootcamp>,
    courses: Vec<Course>,
    reviews: Vec<Review>,
}

impl Tables {
    fn bootcamp_mut(&mut self, id: Uuid) -> Result<&mut Bootcamp, StoreError> {
        self.bootcamps
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("Bootcamp", id))
    }

    fn refresh_cost(&mut self, bootcamp_id: Uuid) {
        let tuitions: Vec<_> = self
            .courses
            .iter()
            .filter(|c| c.bootcamp_id == bootcamp_id)
            .map(|c| c.tuition)
            .collect();
        if let Ok(bootcamp) = self.bootcamp_mut(bootcamp_id) {
            bootcamp.average_cost = average_cost(&tuitions);
        }
    }

    fn refresh_rating(&mut self, bootcamp_id: Uuid) {
        let ratings: Vec<_> = self
            .reviews
            .iter()
            .filter(|r| r.bootcamp_id == bootcamp_id)
            .map(|r| r.rating)
            .collect();
        if let Ok(bootcamp) = self.bootcamp_mut(bootcamp_id) {
            bootcamp.average_rating = average_rating(&ratings);
        }
    }

    fn remove_bootcamp(&mut self, id: Uuid) {
        self.bootcamps.retain(|b| b.id != id);
        self.courses.retain(|c| c.bootcamp_id != id);
        self.reviews.retain(|r| r.bootcamp_id != id);
    }
}

/// `Store` over plain vectors behind one lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking test thread must not take the remaining tests down with it
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.reset_token_matches(token_hash, now))
            .cloned())
    }

    async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, StoreError> {
        Ok(Filter::apply(self.read().users.clone(), query))
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write();
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            role: new.role,
            password_hash: new.password_hash,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let mut tables = self.write();
        if let Some(email) = &changes.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate("users_email_key".into()));
            }
        }
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("User", id))?;
        if let Some(v) = changes.name {
            user.name = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.role {
            user.role = v;
        }
        Ok(user.clone())
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError> {
        let mut tables = self.write();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("User", id))?;
        user.password_hash = password_hash;
        user.reset_password_token = None;
        user.reset_password_expire = None;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<(String, DateTime<Utc>)>,
    ) -> Result<(), StoreError> {
        let mut tables = self.write();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("User", id))?;
        let (hash, expire) = token.unzip();
        user.reset_password_token = hash;
        user.reset_password_expire = expire;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write();
        if !tables.users.iter().any(|u| u.id == id) {
            return Err(not_found("User", id));
        }

        let owned: Vec<Uuid> = tables
            .bootcamps
            .iter()
            .filter(|b| b.user_id == id)
            .map(|b| b.id)
            .collect();
        let mut touched: Vec<Uuid> = tables
            .courses
            .iter()
            .map(|c| (c.user_id, c.bootcamp_id))
            .chain(tables.reviews.iter().map(|r| (r.user_id, r.bootcamp_id)))
            .filter(|(user_id, bootcamp_id)| *user_id == id && !owned.contains(bootcamp_id))
            .map(|(_, bootcamp_id)| bootcamp_id)
            .collect();
        touched.sort();
        touched.dedup();

        for bootcamp_id in owned {
            tables.remove_bootcamp(bootcamp_id);
        }
        tables.courses.retain(|c| c.user_id != id);
        tables.reviews.retain(|r| r.user_id != id);
        tables.users.retain(|u| u.id != id);

        for bootcamp_id in touched {
            tables.refresh_cost(bootcamp_id);
            tables.refresh_rating(bootcamp_id);
        }
        Ok(())
    }
}

#[async_trait]
impl BootcampStore for MemoryStore {
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        Ok(self.read().bootcamps.iter().find(|b| b.id == id).cloned())
    }

    async fn find_bootcamp_by_owner(&self, user_id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        Ok(self.read().bootcamps.iter().find(|b| b.user_id == user_id).cloned())
    }

    async fn find_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError> {
        Ok(self
            .read()
            .bootcamps
            .iter()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn list_bootcamps(&self, query: &ListQuery) -> Result<Page<Bootcamp>, StoreError> {
        Ok(Filter::apply(self.read().bootcamps.clone(), query))
    }

    async fn bootcamps_within(
        &self,
        center: Coordinates,
        angular_radius: f64,
    ) -> Result<Vec<Bootcamp>, StoreError> {
        Ok(self
            .read()
            .bootcamps
            .iter()
            .filter(|b| {
                b.location
                    .as_ref()
                    .map(|l| geo::within_cap(center, l.point(), angular_radius))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn create_bootcamp(&self, new: NewBootcamp) -> Result<Bootcamp, StoreError> {
        let mut tables = self.write();
        if tables.bootcamps.iter().any(|b| b.name == new.name) {
            return Err(StoreError::Duplicate("bootcamps_name_key".into()));
        }
        let bootcamp = Bootcamp::from_new(Uuid::new_v4(), new, Utc::now());
        tables.bootcamps.push(bootcamp.clone());
        Ok(bootcamp)
    }

    async fn update_bootcamp(&self, id: Uuid, changes: BootcampChanges) -> Result<Bootcamp, StoreError> {
        let mut tables = self.write();
        if let Some(name) = &changes.name {
            if tables.bootcamps.iter().any(|b| b.id != id && &b.name == name) {
                return Err(StoreError::Duplicate("bootcamps_name_key".into()));
            }
        }
        let bootcamp = tables.bootcamp_mut(id)?;
        bootcamp.apply(changes);
        Ok(bootcamp.clone())
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<(), StoreError> {
        self.write().bootcamp_mut(id)?.photo = photo.to_string();
        Ok(())
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write();
        tables.bootcamp_mut(id)?;
        tables.remove_bootcamp(id);
        Ok(())
    }

    async fn refresh_average_cost(&self, bootcamp_id: Uuid) -> Result<(), StoreError> {
        self.write().refresh_cost(bootcamp_id);
        Ok(())
    }

    async fn refresh_average_rating(&self, bootcamp_id: Uuid) -> Result<(), StoreError> {
        self.write().refresh_rating(bootcamp_id);
        Ok(())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self.read().courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, StoreError> {
        Ok(Filter::apply(self.read().courses.clone(), query))
    }

    async fn courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Course>, StoreError> {
        self.courses_for_bootcamps(&[bootcamp_id]).await
    }

    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        Ok(self
            .read()
            .courses
            .iter()
            .filter(|c| bootcamp_ids.contains(&c.bootcamp_id))
            .cloned()
            .collect())
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        let mut tables = self.write();
        tables.bootcamp_mut(new.bootcamp_id)?;
        let course = Course::from_new(Uuid::new_v4(), new, Utc::now());
        tables.courses.push(course.clone());
        tables.refresh_cost(course.bootcamp_id);
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> Result<Course, StoreError> {
        let mut tables = self.write();
        let course = tables
            .courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Course", id))?;
        course.apply(changes);
        let course = course.clone();
        tables.refresh_cost(course.bootcamp_id);
        Ok(course)
    }

    async fn delete_course(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write();
        let bootcamp_id = tables
            .courses
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.bootcamp_id)
            .ok_or_else(|| not_found("Course", id))?;
        tables.courses.retain(|c| c.id != id);
        tables.refresh_cost(bootcamp_id);
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        Ok(self.read().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reviews(&self, query: &ListQuery) -> Result<Page<Review>, StoreError> {
        Ok(Filter::apply(self.read().reviews.clone(), query))
    }

    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError> {
        Ok(self
            .read()
            .reviews
            .iter()
            .filter(|r| r.bootcamp_id == bootcamp_id)
            .cloned()
            .collect())
    }

    async fn create_review(&self, new: NewReview) -> Result<Review, StoreError> {
        let mut tables = self.write();
        tables.bootcamp_mut(new.bootcamp_id)?;
        if tables
            .reviews
            .iter()
            .any(|r| r.bootcamp_id == new.bootcamp_id && r.user_id == new.user_id)
        {
            return Err(StoreError::Duplicate("reviews_one_per_user".into()));
        }
        let review = Review::from_new(Uuid::new_v4(), new, Utc::now());
        tables.reviews.push(review.clone());
        tables.refresh_rating(review.bootcamp_id);
        Ok(review)
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> Result<Review, StoreError> {
        let mut tables = self.write();
        let review = tables
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("Review", id))?;
        review.apply(changes);
        let review = review.clone();
        tables.refresh_rating(review.bootcamp_id);
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write();
        let bootcamp_id = tables
            .reviews
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.bootcamp_id)
            .ok_or_else(|| not_found("Review", id))?;
        tables.reviews.retain(|r| r.id != id);
        tables.refresh_rating(bootcamp_id);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn destroy_all(&self) -> Result<(), StoreError> {
        *self.write() = Tables::default();
        Ok(())
    }
}

/// Geocoder answering from a fixed query → location table
#[derive(Default)]
pub struct StaticGeocoder {
    locations: HashMap<String, GeocodedLocation>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, latitude: f64, longitude: f64) -> Self {
        self.locations.insert(
            query.to_string(),
            GeocodedLocation {
                coordinates: Coordinates::new(latitude, longitude),
                formatted_address: Some(query.to_string()),
                street: None,
                city: None,
                state: None,
                zipcode: None,
                country: Some("US".to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &str) -> Result<GeocodedLocation, GeocodeError> {
        self.locations
            .get(query)
            .cloned()
            .ok_or_else(|| GeocodeError::NoResults(query.to_string()))
    }
}

/// Mailer that keeps every message; `fail(true)` makes deliveries fail
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(format!("delivery to {} disabled", message.to)));
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
        Ok(())
    }
}
