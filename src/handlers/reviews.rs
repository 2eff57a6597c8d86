use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{bootcamp_summaries, list_response, parse_list, populate_bootcamp, project, to_json};
use crate::database::models::review::{self, RATING_RANGE, TITLE_MAX_LENGTH};
use crate::database::models::{present, FieldErrors, NewReview, Review, ReviewChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, IdPath, JsonBody, ListParams};
use crate::policy::{ensure_owner, require_role};
use crate::state::AppState;
use crate::types::{Operation, ResourceKind, Role};

const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

#[derive(Debug, Default, Deserialize)]
pub struct ReviewBody {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i64>,
}

impl ReviewBody {
    fn validate(&self, creating: bool) -> Result<Option<i16>, ApiError> {
        let mut errors = FieldErrors::new();
        if creating || self.title.is_some() {
            errors.check(present(&self.title), "title", "Please add a title for the review");
        }
        if let Some(title) = &self.title {
            errors.check(
                title.chars().count() <= TITLE_MAX_LENGTH,
                "title",
                "Title can not be more than 100 characters",
            );
        }
        if creating || self.text.is_some() {
            errors.check(present(&self.text), "text", "Please add some text");
        }

        let rating = self
            .rating
            .and_then(|r| i16::try_from(r).ok())
            .filter(|r| RATING_RANGE.contains(r));
        if creating || self.rating.is_some() {
            errors.check(rating.is_some(), "rating", "Please add a rating between 1 and 10");
        }
        errors.finish()?;
        Ok(rating)
    }
}

/// GET /api/v1/reviews - List reviews with advanced results, each with its bootcamp summary
pub async fn get_reviews(
    State(state): State<AppState>,
    params: ListParams,
) -> ApiResult<Vec<Value>> {
    let query = parse_list(&state, &review::FIELDS, &params)?;
    let page = state.store.list_reviews(&query).await?;
    let summaries = bootcamp_summaries(&state, page.items.iter().map(|r| r.bootcamp_id)).await?;

    let items = page
        .items
        .iter()
        .map(|review| {
            let value = project(to_json(review)?, query.select.as_deref());
            Ok(populate_bootcamp(value, review.bootcamp_id, &summaries))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(list_response(items, &query, page.total))
}

/// GET /api/v1/bootcamps/:bootcampId/reviews - All reviews of one bootcamp
pub async fn get_bootcamp_reviews(
    State(state): State<AppState>,
    IdPath(bootcamp_id): IdPath,
) -> ApiResult<Vec<Value>> {
    state
        .store
        .find_bootcamp(bootcamp_id)
        .await?
        .ok_or_else(|| no_bootcamp(bootcamp_id))?;

    let reviews = state.store.reviews_for_bootcamp(bootcamp_id).await?;
    let items = reviews.iter().map(to_json).collect::<Result<Vec<_>, _>>()?;
    let count = items.len();
    Ok(ApiResponse::success(items).with_count(count))
}

/// GET /api/v1/reviews/:id - Single review with its bootcamp summary
pub async fn get_review(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    let review = find(&state, id).await?;
    let summaries = bootcamp_summaries(&state, [review.bootcamp_id]).await?;
    Ok(ApiResponse::success(populate_bootcamp(
        to_json(&review)?,
        review.bootcamp_id,
        &summaries,
    )))
}

/// POST /api/v1/bootcamps/:bootcampId/reviews - Review a bootcamp
///
/// One review per user and bootcamp; a second attempt is rejected as a duplicate.
pub async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(bootcamp_id): IdPath,
    JsonBody(body): JsonBody<ReviewBody>,
) -> ApiResult<Value> {
    require_role(&user, REVIEWERS)?;

    state
        .store
        .find_bootcamp(bootcamp_id)
        .await?
        .ok_or_else(|| no_bootcamp(bootcamp_id))?;

    let rating = body.validate(true)?;
    let new = NewReview {
        bootcamp_id,
        user_id: user.id,
        title: body.title.unwrap_or_default().trim().to_string(),
        text: body.text.unwrap_or_default(),
        rating: rating.unwrap_or(*RATING_RANGE.start()),
    };

    let created = state.store.create_review(new).await?;
    tracing::info!("User {} reviewed bootcamp {}", user.id, bootcamp_id);
    Ok(ApiResponse::created(to_json(&created)?))
}

/// PUT /api/v1/reviews/:id - Update a review
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<ReviewBody>,
) -> ApiResult<Value> {
    let current = find(&state, id).await?;
    ensure_owner(current.user_id, &user, Operation::Update, ResourceKind::Review)?;

    let rating = body.validate(false)?;
    let changes = ReviewChanges {
        title: body.title.map(|t| t.trim().to_string()),
        text: body.text,
        rating,
    };

    let updated = state.store.update_review(id, changes).await?;
    Ok(ApiResponse::success(to_json(&updated)?))
}

/// DELETE /api/v1/reviews/:id - Delete a review
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    let current = find(&state, id).await?;
    ensure_owner(current.user_id, &user, Operation::Delete, ResourceKind::Review)?;

    state.store.delete_review(id).await?;
    Ok(ApiResponse::success(Value::Object(Default::default())))
}

async fn find(state: &AppState, id: Uuid) -> Result<Review, ApiError> {
    state
        .store
        .find_review(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No review found with the id of {}", id)))
}

fn no_bootcamp(id: Uuid) -> ApiError {
    ApiError::not_found(format!("No bootcamp with the id of {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_between_one_and_ten() {
        for rating in [0, 11, -3, 40_000] {
            let body = ReviewBody {
                title: Some("Great".into()),
                text: Some("Learned a lot".into()),
                rating: Some(rating),
            };
            assert_eq!(
                body.validate(true).unwrap_err().message(),
                "Please add a rating between 1 and 10"
            );
        }

        let body = ReviewBody {
            title: Some("Great".into()),
            text: Some("Learned a lot".into()),
            rating: Some(10),
        };
        assert_eq!(body.validate(true).unwrap(), Some(10));
    }

    #[test]
    fn partial_update_without_rating() {
        let body = ReviewBody {
            text: Some("Updated".into()),
            ..Default::default()
        };
        assert_eq!(body.validate(false).unwrap(), None);

        let body = ReviewBody {
            title: Some("t".repeat(101)),
            ..Default::default()
        };
        assert_eq!(
            body.validate(false).unwrap_err().message(),
            "Title can not be more than 100 characters"
        );
    }
}
