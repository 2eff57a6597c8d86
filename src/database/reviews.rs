use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::models::{NewReview, Review, ReviewChanges};
use super::repository::{not_found, BootcampStore, ReviewStore};
use super::{PgStore, StoreError};
use crate::filter::{Filter, ListQuery, Page};

#[derive(Debug, FromRow)]
pub(crate) struct ReviewRow {
    id: Uuid,
    bootcamp_id: Uuid,
    user_id: Uuid,
    title: String,
    text: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            bootcamp_id: row.bootcamp_id,
            user_id: row.user_id,
            title: row.title,
            text: row.text,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Review::from))
    }

    async fn list_reviews(&self, query: &ListQuery) -> Result<Page<Review>, StoreError> {
        let filter = Filter::new("reviews", query);
        let rows: Vec<ReviewRow> = self.fetch_rows(&filter.to_sql()).await?;
        let total = self.fetch_count(&filter.to_count_sql()).await?;
        Ok(Page {
            items: rows.into_iter().map(Review::from).collect(),
            total,
        })
    }

    async fn reviews_for_bootcamp(&self, bootcamp_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT * FROM reviews WHERE bootcamp_id = $1 ORDER BY created_at",
        )
        .bind(bootcamp_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn create_review(&self, new: NewReview) -> Result<Review, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO reviews (id, bootcamp_id, user_id, title, text, rating) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.bootcamp_id)
        .bind(new.user_id)
        .bind(new.title)
        .bind(new.text)
        .bind(new.rating)
        .fetch_one(self.pool())
        .await?;
        let review = Review::from(row);
        self.refresh_average_rating(review.bootcamp_id).await?;
        Ok(review)
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> Result<Review, StoreError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "UPDATE reviews SET \
               title = COALESCE($2, title), \
               text = COALESCE($3, text), \
               rating = COALESCE($4, rating) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.text)
        .bind(changes.rating)
        .fetch_optional(self.pool())
        .await?;
        let review = row.map(Review::from).ok_or_else(|| not_found("Review", id))?;
        self.refresh_average_rating(review.bootcamp_id).await?;
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> Result<(), StoreError> {
        let bootcamp_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING bootcamp_id")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        let bootcamp_id = bootcamp_id.ok_or_else(|| not_found("Review", id))?;
        self.refresh_average_rating(bootcamp_id).await
    }
}
