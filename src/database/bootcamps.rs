use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::models::{Bootcamp, BootcampChanges, Location, NewBootcamp};
use super::repository::{not_found, BootcampStore};
use super::{PgStore, StoreError};
use crate::filter::{Filter, ListQuery, Page};
use crate::geo::{self, Coordinates};

#[derive(Debug, FromRow)]
pub(crate) struct BootcampRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    slug: String,
    description: String,
    website: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    formatted_address: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zipcode: Option<String>,
    country: Option<String>,
    careers: Vec<String>,
    average_rating: Option<f64>,
    average_cost: Option<Decimal>,
    photo: String,
    housing: bool,
    job_assistance: bool,
    job_guarantee: bool,
    accept_gi: bool,
    created_at: DateTime<Utc>,
}

impl From<BootcampRow> for Bootcamp {
    fn from(row: BootcampRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                kind: "Point".to_string(),
                coordinates: [longitude, latitude],
                formatted_address: row.formatted_address,
                street: row.street,
                city: row.city,
                state: row.state,
                zipcode: row.zipcode,
                country: row.country,
            }),
            _ => None,
        };
        Bootcamp {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            website: row.website,
            phone: row.phone,
            email: row.email,
            address: row.address,
            location,
            careers: row.careers,
            average_rating: row.average_rating,
            average_cost: row.average_cost,
            photo: row.photo,
            housing: row.housing,
            job_assistance: row.job_assistance,
            job_guarantee: row.job_guarantee,
            accept_gi: row.accept_gi,
            created_at: row.created_at,
        }
    }
}

fn into_bootcamps(rows: Vec<BootcampRow>) -> Vec<Bootcamp> {
    rows.into_iter().map(Bootcamp::from).collect()
}

/// Flattened location columns, all `None` when no location is given
#[derive(Default)]
struct LocationColumns {
    latitude: Option<f64>,
    longitude: Option<f64>,
    formatted_address: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zipcode: Option<String>,
    country: Option<String>,
}

impl From<Option<Location>> for LocationColumns {
    fn from(location: Option<Location>) -> Self {
        match location {
            Some(loc) => Self {
                latitude: Some(loc.coordinates[1]),
                longitude: Some(loc.coordinates[0]),
                formatted_address: loc.formatted_address,
                street: loc.street,
                city: loc.city,
                state: loc.state,
                zipcode: loc.zipcode,
                country: loc.country,
            },
            None => Self::default(),
        }
    }
}

#[async_trait]
impl BootcampStore for PgStore {
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        let row = sqlx::query_as::<_, BootcampRow>("SELECT * FROM bootcamps WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Bootcamp::from))
    }

    async fn find_bootcamp_by_owner(&self, user_id: Uuid) -> Result<Option<Bootcamp>, StoreError> {
        let row = sqlx::query_as::<_, BootcampRow>(
            "SELECT * FROM bootcamps WHERE user_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Bootcamp::from))
    }

    async fn find_bootcamps(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, BootcampRow>("SELECT * FROM bootcamps WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(self.pool())
            .await?;
        Ok(into_bootcamps(rows))
    }

    async fn list_bootcamps(&self, query: &ListQuery) -> Result<Page<Bootcamp>, StoreError> {
        let filter = Filter::new("bootcamps", query);
        let rows: Vec<BootcampRow> = self.fetch_rows(&filter.to_sql()).await?;
        let total = self.fetch_count(&filter.to_count_sql()).await?;
        Ok(Page {
            items: into_bootcamps(rows),
            total,
        })
    }

    async fn bootcamps_within(
        &self,
        center: Coordinates,
        angular_radius: f64,
    ) -> Result<Vec<Bootcamp>, StoreError> {
        let sql = format!(
            "SELECT * FROM bootcamps WHERE latitude IS NOT NULL AND longitude IS NOT NULL AND {} \
             ORDER BY created_at DESC",
            geo::within_cap_sql(1)
        );
        let rows = sqlx::query_as::<_, BootcampRow>(&sql)
            .bind(center.latitude)
            .bind(center.longitude)
            .bind(angular_radius)
            .fetch_all(self.pool())
            .await?;
        Ok(into_bootcamps(rows))
    }

    async fn create_bootcamp(&self, new: NewBootcamp) -> Result<Bootcamp, StoreError> {
        let loc = LocationColumns::from(new.location);
        let row = sqlx::query_as::<_, BootcampRow>(
            "INSERT INTO bootcamps (id, user_id, name, slug, description, website, phone, email, \
               address, latitude, longitude, formatted_address, street, city, state, zipcode, \
               country, careers, housing, job_assistance, job_guarantee, accept_gi) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
               $18, $19, $20, $21, $22) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.name)
        .bind(new.slug)
        .bind(new.description)
        .bind(new.website)
        .bind(new.phone)
        .bind(new.email)
        .bind(new.address)
        .bind(loc.latitude)
        .bind(loc.longitude)
        .bind(loc.formatted_address)
        .bind(loc.street)
        .bind(loc.city)
        .bind(loc.state)
        .bind(loc.zipcode)
        .bind(loc.country)
        .bind(new.careers)
        .bind(new.housing)
        .bind(new.job_assistance)
        .bind(new.job_guarantee)
        .bind(new.accept_gi)
        .fetch_one(self.pool())
        .await?;
        Ok(Bootcamp::from(row))
    }

    async fn update_bootcamp(&self, id: Uuid, changes: BootcampChanges) -> Result<Bootcamp, StoreError> {
        let loc = LocationColumns::from(changes.location);
        let row = sqlx::query_as::<_, BootcampRow>(
            "UPDATE bootcamps SET \
               name = COALESCE($2, name), \
               slug = COALESCE($3, slug), \
               description = COALESCE($4, description), \
               website = COALESCE($5, website), \
               phone = COALESCE($6, phone), \
               email = COALESCE($7, email), \
               address = COALESCE($8, address), \
               latitude = COALESCE($9, latitude), \
               longitude = COALESCE($10, longitude), \
               formatted_address = COALESCE($11, formatted_address), \
               street = COALESCE($12, street), \
               city = COALESCE($13, city), \
               state = COALESCE($14, state), \
               zipcode = COALESCE($15, zipcode), \
               country = COALESCE($16, country), \
               careers = COALESCE($17, careers), \
               housing = COALESCE($18, housing), \
               job_assistance = COALESCE($19, job_assistance), \
               job_guarantee = COALESCE($20, job_guarantee), \
               accept_gi = COALESCE($21, accept_gi) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.slug)
        .bind(changes.description)
        .bind(changes.website)
        .bind(changes.phone)
        .bind(changes.email)
        .bind(changes.address)
        .bind(loc.latitude)
        .bind(loc.longitude)
        .bind(loc.formatted_address)
        .bind(loc.street)
        .bind(loc.city)
        .bind(loc.state)
        .bind(loc.zipcode)
        .bind(loc.country)
        .bind(changes.careers)
        .bind(changes.housing)
        .bind(changes.job_assistance)
        .bind(changes.job_guarantee)
        .bind(changes.accept_gi)
        .fetch_optional(self.pool())
        .await?;
        row.map(Bootcamp::from).ok_or_else(|| not_found("Bootcamp", id))
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE bootcamps SET photo = $2 WHERE id = $1")
            .bind(id)
            .bind(photo)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Bootcamp", id));
        }
        Ok(())
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<(), StoreError> {
        // courses and reviews go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Bootcamp", id));
        }
        Ok(())
    }

    async fn refresh_average_cost(&self, bootcamp_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE bootcamps SET average_cost = \
               (SELECT CEIL(AVG(tuition) / 10) * 10 FROM courses WHERE bootcamp_id = $1) \
             WHERE id = $1",
        )
        .bind(bootcamp_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn refresh_average_rating(&self, bootcamp_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE bootcamps SET average_rating = \
               (SELECT AVG(rating)::float8 FROM reviews WHERE bootcamp_id = $1) \
             WHERE id = $1",
        )
        .bind(bootcamp_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
