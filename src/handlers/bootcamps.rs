use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{list_response, parse_list, project, to_json};
use crate::database::models::bootcamp::{
    self, is_known_career, is_valid_website, slugify, DESCRIPTION_MAX_LENGTH, NAME_MAX_LENGTH,
    PHONE_MAX_LENGTH,
};
use crate::database::models::{is_valid_email, present, BootcampChanges, FieldErrors, Location, NewBootcamp};
use crate::error::ApiError;
use crate::geo::{self, DistanceUnit};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, IdPath, JsonBody, ListParams};
use crate::policy::{ensure_can_create_bootcamp, ensure_owner, require_role};
use crate::state::AppState;
use crate::types::{Operation, ResourceKind, Role};
use crate::uploads;

const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

/// Bootcamp fields accepted from clients. Ownership, slug, averages and photo
/// are server-managed and silently ignored when sent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl BootcampBody {
    /// Full validation on create; on update only the supplied fields are checked
    pub fn validate(&self, creating: bool) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        if creating || self.name.is_some() {
            errors.check(present(&self.name), "name", "Please add a name");
        }
        if let Some(name) = &self.name {
            errors.check(
                name.chars().count() <= NAME_MAX_LENGTH,
                "name",
                "Name can not be more than 50 characters",
            );
        }

        if creating || self.description.is_some() {
            errors.check(present(&self.description), "description", "Please add a description");
        }
        if let Some(description) = &self.description {
            errors.check(
                description.chars().count() <= DESCRIPTION_MAX_LENGTH,
                "description",
                "Description can not be more than 500 characters",
            );
        }

        if let Some(website) = &self.website {
            errors.check(
                is_valid_website(website),
                "website",
                "Please use a valid URL with HTTP or HTTPS",
            );
        }
        if let Some(phone) = &self.phone {
            errors.check(
                phone.chars().count() <= PHONE_MAX_LENGTH,
                "phone",
                "Phone number can not be longer than 20 characters",
            );
        }
        if let Some(email) = &self.email {
            errors.check(is_valid_email(email), "email", "Please add a valid email");
        }

        if creating || self.address.is_some() {
            errors.check(present(&self.address), "address", "Please add an address");
        }

        match &self.careers {
            Some(careers) => {
                errors.check(!careers.is_empty(), "careers", "Please add at least one career");
                if let Some(unknown) = careers.iter().find(|c| !is_known_career(c)) {
                    errors.check(
                        false,
                        "careers",
                        format!("{} is not a supported career", unknown),
                    );
                }
            }
            None if creating => {
                errors.check(false, "careers", "Please add at least one career");
            }
            None => {}
        }

        errors.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct RadiusQuery {
    pub unit: Option<String>,
}

/// GET /api/v1/bootcamps - List bootcamps with advanced results
///
/// Each bootcamp carries its `courses`. Filters such as
/// `?averageCost[lte]=10000&careers[in]=Business&select=name,description&sort=-name&page=2`
/// are interpreted by `ListQueryParser`.
pub async fn get_bootcamps(
    State(state): State<AppState>,
    params: ListParams,
) -> ApiResult<Vec<Value>> {
    let query = parse_list(&state, &bootcamp::FIELDS, &params)?;
    let page = state.store.list_bootcamps(&query).await?;

    let ids: Vec<Uuid> = page.items.iter().map(|b| b.id).collect();
    let mut courses_by_bootcamp: HashMap<Uuid, Vec<Value>> = HashMap::new();
    for course in state.store.courses_for_bootcamps(&ids).await? {
        courses_by_bootcamp
            .entry(course.bootcamp_id)
            .or_default()
            .push(to_json(&course)?);
    }

    let mut items = Vec::with_capacity(page.items.len());
    for bootcamp in &page.items {
        let mut value = project(to_json(bootcamp)?, query.select.as_deref());
        if let Value::Object(map) = &mut value {
            let courses = courses_by_bootcamp.remove(&bootcamp.id).unwrap_or_default();
            map.insert("courses".to_string(), Value::Array(courses));
        }
        items.push(value);
    }

    Ok(list_response(items, &query, page.total))
}

/// GET /api/v1/bootcamps/:id - Single bootcamp
pub async fn get_bootcamp(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    let bootcamp = state
        .store
        .find_bootcamp(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(ApiResponse::success(to_json(&bootcamp)?))
}

/// POST /api/v1/bootcamps - Publish a bootcamp owned by the caller
///
/// The address is geocoded into `location`; non-admins may publish only one
/// bootcamp.
pub async fn create_bootcamp(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<BootcampBody>,
) -> ApiResult<Value> {
    require_role(&user, PUBLISHERS)?;

    let existing = state.store.find_bootcamp_by_owner(user.id).await?;
    ensure_can_create_bootcamp(existing.map(|b| b.id), &user)?;

    body.validate(true)?;

    let name = body.name.unwrap_or_default().trim().to_string();
    let address = body.address.unwrap_or_default();
    let location = Location::from(state.geocoder.geocode(&address).await?);

    let new = NewBootcamp {
        user_id: user.id,
        slug: slugify(&name),
        name,
        description: body.description.unwrap_or_default(),
        website: body.website,
        phone: body.phone,
        email: body.email,
        address: Some(address),
        location: Some(location),
        careers: body.careers.unwrap_or_default(),
        housing: body.housing.unwrap_or(false),
        job_assistance: body.job_assistance.unwrap_or(false),
        job_guarantee: body.job_guarantee.unwrap_or(false),
        accept_gi: body.accept_gi.unwrap_or(false),
    };

    let created = state.store.create_bootcamp(new).await?;
    tracing::info!("User {} published bootcamp {} ({})", user.id, created.id, created.slug);
    Ok(ApiResponse::created(to_json(&created)?))
}

/// PUT /api/v1/bootcamps/:id - Update a bootcamp
///
/// A changed name regenerates the slug, a changed address is re-geocoded.
pub async fn update_bootcamp(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
    JsonBody(body): JsonBody<BootcampBody>,
) -> ApiResult<Value> {
    require_role(&user, PUBLISHERS)?;

    let current = state
        .store
        .find_bootcamp(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    ensure_owner(current.user_id, &user, Operation::Update, ResourceKind::Bootcamp)?;

    body.validate(false)?;

    let name = body.name.map(|n| n.trim().to_string());
    let slug = name.as_deref().map(slugify);

    let location = match &body.address {
        Some(address) if current.address.as_deref() != Some(address.as_str()) => {
            Some(Location::from(state.geocoder.geocode(address).await?))
        }
        _ => None,
    };

    let changes = BootcampChanges {
        name,
        slug,
        description: body.description,
        website: body.website,
        phone: body.phone,
        email: body.email,
        address: body.address,
        location,
        careers: body.careers,
        housing: body.housing,
        job_assistance: body.job_assistance,
        job_guarantee: body.job_guarantee,
        accept_gi: body.accept_gi,
    };

    let updated = state.store.update_bootcamp(id, changes).await?;
    Ok(ApiResponse::success(to_json(&updated)?))
}

/// DELETE /api/v1/bootcamps/:id - Delete a bootcamp with its courses and reviews
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> ApiResult<Value> {
    require_role(&user, PUBLISHERS)?;

    let current = state
        .store
        .find_bootcamp(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    ensure_owner(current.user_id, &user, Operation::Delete, ResourceKind::Bootcamp)?;

    state.store.delete_bootcamp(id).await?;
    tracing::info!("User {} deleted bootcamp {}", user.id, id);
    Ok(ApiResponse::success(Value::Object(Default::default())))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - Bootcamps within a distance
///
/// Distance is in miles unless `?unit=km`.
pub async fn get_bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
    Query(radius): Query<RadiusQuery>,
) -> ApiResult<Vec<Value>> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request("Please provide a valid distance"))?;
    let unit = DistanceUnit::from_param(radius.unit.as_deref())
        .ok_or_else(|| ApiError::bad_request("Distance unit must be mi or km"))?;

    let center = state.geocoder.geocode(&zipcode).await?.coordinates;
    let bootcamps = state
        .store
        .bootcamps_within(center, geo::angular_radius(distance, unit))
        .await?;

    let items = bootcamps.iter().map(to_json).collect::<Result<Vec<_>, _>>()?;
    let count = items.len();
    Ok(ApiResponse::success(items).with_count(count))
}

/// PUT /api/v1/bootcamps/:id/photo - Upload the bootcamp photo
///
/// Multipart form with a `file` field holding an image. The stored name is
/// `photo_<id><ext>` and becomes the bootcamp's `photo`.
pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
    multipart: Option<Multipart>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&user, PUBLISHERS)?;

    let current = state
        .store
        .find_bootcamp(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    ensure_owner(current.user_id, &user, Operation::Update, ResourceKind::Bootcamp)?;

    let file = match multipart {
        Some(multipart) => uploads::read_file_field(multipart).await?,
        None => None,
    };
    let file = uploads::validate_image(file, state.config.upload.max_file_size)?;

    let file_name = uploads::photo_file_name(id, &file.file_name);
    uploads::save(FsPath::new(&state.config.upload.path), &file_name, &file.bytes).await?;
    state.store.set_bootcamp_photo(id, &file_name).await?;

    tracing::info!("Stored photo {} for bootcamp {}", file_name, id);
    Ok(ApiResponse::success(file_name))
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Bootcamp not found with id of {}", id))
}
