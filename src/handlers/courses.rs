use axum::extract::State;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{bootcamp_summaries, list_response, parse_list, populate_bootcamp, project, to_json, TextOrNumber};
use crate::database::models::course::{self, MinimumSkill};
use crate::database::models::{present, Course, CourseChanges, FieldErrors, NewCourse};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, IdPath, JsonBody, ListParams};
use crate::policy::{ensure_owner, require_role};
use crate::state::AppState;
use crate::types::{Operation, ResourceKind, Role};

const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<TextOrNumber>,
    pub tuition: Option<Decimal>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

/// Validated course input
struct CourseInput {
    title: Option<String>,
    description: Option<String>,
    weeks: Option<String>,
    tuition: Option<Decimal>,
    minimum_skill: Option<MinimumSkill>,
    scholarship_available: Option<bool>,
}

impl CourseBody {
    fn validate(self, creating: bool) -> Result<CourseInput, ApiError> {
        let weeks = self.weeks.map(TextOrNumber::into_string);
        let minimum_skill = self.minimum_skill.as_deref().map(str::parse::<MinimumSkill>);

        let mut errors = FieldErrors::new();
        if creating || self.title.is_some() {
            errors.check(present(&self.title), "title", "Please add a course title");
        }
        if creating || self.description.is_some() {
            errors.check(present(&self.description), "description", "Please add a description");
        }
        if creating || weeks.is_some() {
            errors.check(present(&weeks), "weeks", "Please add number of weeks");
        }
        match self.tuition {
            Some(tuition) => {
                errors.check(
                    tuition >= Decimal::ZERO,
                    "tuition",
                    "Tuition cost can not be negative",
                );
            }
            None => {
                errors.check(!creating, "tuition", "Please add a tuition cost");
            }
        }
        match &minimum_skill {
            Some(Err(_)) => {
                errors.check(
                    false,
                    "minimumSkill",
                    "Minimum skill must be one of: beginner, intermediate, advanced",
                );
            }
            Some(Ok(_)) => {}
            None => {
                errors.check(!creating, "minimumSkill", "Please add a minimum skill");
            }
        }
        errors.finish()?;

        Ok(CourseInput {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            weeks,
            tuition: self.tuition,
            minimum_skill: minimum_skill.and_then(Result::ok),
            scholarship_available: self.scholarship_available,
        })
    }
}

/// GET /api/v1/courses - List courses with advanced results, each with its bootcamp summary
pub async fn get_courses(
    State(state): State<AppState>,
    params: ListParams,
) -> ApiResult<Vec<Value>> {
    let query = parse_list(&state, &course::FIELDS, &params)?;
    let page = state.store.list_courses(&query).await?;
    let summaries = bootcamp_summaries(&state, page.items.iter().map(|c| c.bootcamp_id)).await?;

    let items = page
        .items
        .iter()
        .map(|course| {
            let value = project(to_json(course)?, query.select.as_deref());
            Ok(populate_bootcamp(value, course.bootcamp_id, &summaries))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(list_response(items, &query, page.total))
}

/// GET /api/v1/bootcamps/:bootcampId/courses - All courses of one bootcamp
pub async fn get_bootcamp_courses(
    State(state): State<AppState>,
    IdPath(bootcamp_id): IdPath,
) -> ApiResult<Vec<Value>> {
    state
        .store
        .find_bootcamp(bootcamp_id)
        .await?
        .ok_or_else(|| no_bootcamp(bootcamp_id))?;

    let courses = state.store.courses_for_bootcamp(bootcamp_id).await?;
    let items = courses.iter().map(to_json).collect::<Result<Vec<_>, _>>()?;
    let count = items.len();
    Ok(ApiResponse::success(items).with_count(count))
}

/// GET /api/v1/courses/:id - Single course with its bootcamp summary
pub async fn get_course(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    let course = find(&state, id).await?;
    let summaries = bootcamp_summaries(&state, [course.bootcamp_id]).await?;
    Ok(ApiResponse::success(populate_bootcamp(
        to_json(&course)?,
        course.bootcamp_id,
        &summaries,
    )))
}

/// POST /api/v1/bootcamps/:bootcampId/courses - Add a course to an owned bootcamp
///
/// ```json
/// {"title": "Front End Web Development", "description": "...", "weeks": "8",
///  "tuition": 8000, "minimumSkill": "beginner", "scholarshipAvailable": true}
/// ```
pub async fn add_course(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(bootcamp_id): IdPath,
    JsonBody(body): JsonBody<CourseBody>,
) -> ApiResult<Value> {
    require_role(&user, PUBLISHERS)?;

    let bootcamp = state
        .store
        .find_bootcamp(bootcamp_id)
        .await?
        .ok_or_else(|| no_bootcamp(bootcamp_id))?;
    ensure_owner(bootcamp.user_id, &user, Operation::Create, ResourceKind::Bootcamp)?;

    let input = body.validate(true)?;
    let new = NewCourse {
        bootcamp_id,
        user_id: user.id,
        title: input.title.unwrap_or_default(),
        description: input.description.unwrap_or_default(),
        weeks: input.weeks.unwrap_or_default(),
        tuition: input.tuition.unwrap_or_default(),
        minimum_skill: input.minimum_skill.unwrap_or(MinimumSkill::Beginner),
        scholarship_available: input.scholarship_available.unwrap_or(false),
    };

    let created = state.store.create_course(new).await?;
    tracing::info!("User {} added course {} to bootcamp {}", user.id, created.id, bootcamp_id);
    Ok(ApiResponse::created(to_json(&created)?))
}

/// PUT /api/v1/courses/:id - Update a course
pub async fn update_course(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<CourseBody>,
) -> ApiResult<Value> {
    require_role(&user, PUBLISHERS)?;

    let current = find(&state, id).await?;
    ensure_owner(current.user_id, &user, Operation::Update, ResourceKind::Course)?;

    let input = body.validate(false)?;
    let changes = CourseChanges {
        title: input.title,
        description: input.description,
        weeks: input.weeks,
        tuition: input.tuition,
        minimum_skill: input.minimum_skill,
        scholarship_available: input.scholarship_available,
    };

    let updated = state.store.update_course(id, changes).await?;
    Ok(ApiResponse::success(to_json(&updated)?))
}

/// DELETE /api/v1/courses/:id - Delete a course
pub async fn delete_course(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    require_role(&user, PUBLISHERS)?;

    let current = find(&state, id).await?;
    ensure_owner(current.user_id, &user, Operation::Delete, ResourceKind::Course)?;

    state.store.delete_course(id).await?;
    Ok(ApiResponse::success(Value::Object(Default::default())))
}

async fn find(state: &AppState, id: Uuid) -> Result<Course, ApiError> {
    state
        .store
        .find_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No course with the id of {}", id)))
}

fn no_bootcamp(id: Uuid) -> ApiError {
    ApiError::not_found(format!("No bootcamp with the id of {}", id))
}
