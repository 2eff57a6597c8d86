use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec};
use crate::geo::Coordinates;
use crate::geocoder::GeocodedLocation;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";
pub const NAME_MAX_LENGTH: usize = 50;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;
pub const PHONE_MAX_LENGTH: usize = 20;

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

/// Filterable and sortable bootcamp fields
pub static FIELDS: [FieldSpec; 21] = [
    FieldSpec::new("name", "name", FieldKind::Text),
    FieldSpec::new("slug", "slug", FieldKind::Text),
    FieldSpec::new("description", "description", FieldKind::Text),
    FieldSpec::new("website", "website", FieldKind::Text),
    FieldSpec::new("phone", "phone", FieldKind::Text),
    FieldSpec::new("email", "email", FieldKind::Text),
    FieldSpec::new("address", "address", FieldKind::Text),
    FieldSpec::new("location.city", "city", FieldKind::Text),
    FieldSpec::new("location.state", "state", FieldKind::Text),
    FieldSpec::new("location.zipcode", "zipcode", FieldKind::Text),
    FieldSpec::new("location.country", "country", FieldKind::Text),
    FieldSpec::new("careers", "careers", FieldKind::TextArray),
    FieldSpec::new("averageRating", "average_rating", FieldKind::Number),
    FieldSpec::new("averageCost", "average_cost", FieldKind::Number),
    FieldSpec::new("photo", "photo", FieldKind::Text),
    FieldSpec::new("housing", "housing", FieldKind::Boolean),
    FieldSpec::new("jobAssistance", "job_assistance", FieldKind::Boolean),
    FieldSpec::new("jobGuarantee", "job_guarantee", FieldKind::Boolean),
    FieldSpec::new("acceptGi", "accept_gi", FieldKind::Boolean),
    FieldSpec::new("user", "user_id", FieldKind::Uuid),
    FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
];

/// GeoJSON-style point with the geocoder's address breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn point(&self) -> Coordinates {
        Coordinates::new(self.coordinates[1], self.coordinates[0])
    }
}

impl From<GeocodedLocation> for Location {
    fn from(geo: GeocodedLocation) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [geo.coordinates.longitude, geo.coordinates.latitude],
            formatted_address: geo.formatted_address,
            street: geo.street,
            city: geo.city,
            state: geo.state,
            zipcode: geo.zipcode,
            country: geo.country,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub careers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub average_cost: Option<Decimal>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
}

impl Bootcamp {
    pub fn from_new(id: Uuid, new: NewBootcamp, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            name: new.name,
            slug: new.slug,
            description: new.description,
            website: new.website,
            phone: new.phone,
            email: new.email,
            address: new.address,
            location: new.location,
            careers: new.careers,
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: new.housing,
            job_assistance: new.job_assistance,
            job_guarantee: new.job_guarantee,
            accept_gi: new.accept_gi,
            created_at,
        }
    }

    pub fn apply(&mut self, changes: BootcampChanges) {
        let BootcampChanges {
            name,
            slug,
            description,
            website,
            phone,
            email,
            address,
            location,
            careers,
            housing,
            job_assistance,
            job_guarantee,
            accept_gi,
        } = changes;

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = slug {
            self.slug = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = website {
            self.website = Some(v);
        }
        if let Some(v) = phone {
            self.phone = Some(v);
        }
        if let Some(v) = email {
            self.email = Some(v);
        }
        if let Some(v) = address {
            self.address = Some(v);
        }
        if let Some(v) = location {
            self.location = Some(v);
        }
        if let Some(v) = careers {
            self.careers = v;
        }
        if let Some(v) = housing {
            self.housing = v;
        }
        if let Some(v) = job_assistance {
            self.job_assistance = v;
        }
        if let Some(v) = job_guarantee {
            self.job_guarantee = v;
        }
        if let Some(v) = accept_gi {
            self.accept_gi = v;
        }
    }

    pub fn summary(&self) -> BootcampSummary {
        BootcampSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Bootcamp fields embedded into courses and reviews
#[derive(Debug, Clone, Serialize)]
pub struct BootcampSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewBootcamp {
    pub user_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub careers: Vec<String>,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
}

/// Partial update; `None` leaves the stored value unchanged
#[derive(Debug, Clone, Default)]
pub struct BootcampChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

/// URL slug: lowercase alphanumerics separated by single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Mean tuition rounded up to the next multiple of ten
pub fn average_cost(tuitions: &[Decimal]) -> Option<Decimal> {
    if tuitions.is_empty() {
        return None;
    }
    let mean = tuitions.iter().sum::<Decimal>() / Decimal::from(tuitions.len());
    Some((mean / Decimal::TEN).ceil() * Decimal::TEN)
}

pub fn average_rating(ratings: &[i16]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
    Some(sum / ratings.len() as f64)
}

pub fn is_valid_website(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

pub fn is_known_career(career: &str) -> bool {
    CAREERS.contains(&career)
}
