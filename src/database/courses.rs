use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::models::{Course, CourseChanges, MinimumSkill, NewCourse};
use super::repository::{not_found, BootcampStore, CourseStore};
use super::{PgStore, StoreError};
use crate::filter::{Filter, ListQuery, Page};

#[derive(Debug, FromRow)]
pub(crate) struct CourseRow {
    id: Uuid,
    bootcamp_id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    weeks: String,
    tuition: Decimal,
    minimum_skill: String,
    scholarship_available: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CourseRow> for Course {
    type Error = StoreError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let minimum_skill: MinimumSkill = row
            .minimum_skill
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("course {}: {}", row.id, e)))?;
        Ok(Course {
            id: row.id,
            bootcamp_id: row.bootcamp_id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            weeks: row.weeks,
            tuition: row.tuition,
            minimum_skill,
            scholarship_available: row.scholarship_available,
            created_at: row.created_at,
        })
    }
}

fn into_courses(rows: Vec<CourseRow>) -> Result<Vec<Course>, StoreError> {
    rows.into_iter().map(Course::try_from).collect()
}

#[async_trait]
impl CourseStore for PgStore {
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Course::try_from).transpose()
    }

    async fn list_courses(&self, query: &ListQuery) -> Result<Page<Course>, StoreError> {
        let filter = Filter::new("courses", query);
        let rows: Vec<CourseRow> = self.fetch_rows(&filter.to_sql()).await?;
        let total = self.fetch_count(&filter.to_count_sql()).await?;
        Ok(Page {
            items: into_courses(rows)?,
            total,
        })
    }

    async fn courses_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Course>, StoreError> {
        self.courses_for_bootcamps(&[bootcamp_id]).await
    }

    async fn courses_for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, StoreError> {
        if bootcamp_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT * FROM courses WHERE bootcamp_id = ANY($1) ORDER BY created_at",
        )
        .bind(bootcamp_ids)
        .fetch_all(self.pool())
        .await?;
        into_courses(rows)
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "INSERT INTO courses (id, bootcamp_id, user_id, title, description, weeks, tuition, \
               minimum_skill, scholarship_available) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.bootcamp_id)
        .bind(new.user_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.weeks)
        .bind(new.tuition)
        .bind(new.minimum_skill.as_str())
        .bind(new.scholarship_available)
        .fetch_one(self.pool())
        .await?;
        let course = Course::try_from(row)?;
        self.refresh_average_cost(course.bootcamp_id).await?;
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> Result<Course, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "UPDATE courses SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               weeks = COALESCE($4, weeks), \
               tuition = COALESCE($5, tuition), \
               minimum_skill = COALESCE($6, minimum_skill), \
               scholarship_available = COALESCE($7, scholarship_available) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.weeks)
        .bind(changes.tuition)
        .bind(changes.minimum_skill.map(|s| s.as_str()))
        .bind(changes.scholarship_available)
        .fetch_optional(self.pool())
        .await?;
        let course = row
            .map(Course::try_from)
            .transpose()?
            .ok_or_else(|| not_found("Course", id))?;
        self.refresh_average_cost(course.bootcamp_id).await?;
        Ok(course)
    }

    async fn delete_course(&self, id: Uuid) -> Result<(), StoreError> {
        let bootcamp_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM courses WHERE id = $1 RETURNING bootcamp_id")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        let bootcamp_id = bootcamp_id.ok_or_else(|| not_found("Course", id))?;
        self.refresh_average_cost(bootcamp_id).await
    }
}
