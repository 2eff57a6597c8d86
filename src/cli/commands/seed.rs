//! Sample data import. Each JSON file holds an array of records that refer to
//! each other through their own `id` strings; fresh UUIDs are assigned on import
//! and references are rewritten accordingly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Subcommand;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::database::models::bootcamp::slugify;
use crate::database::models::{Location, MinimumSkill, NewBootcamp, NewCourse, NewReview, NewUser};
use crate::database::Store;
use crate::geocoder::{Geocoder, MapQuestGeocoder};
use crate::types::Role;

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import users, bootcamps, courses and reviews from JSON files")]
    Import {
        #[arg(long, help = "Directory holding users.json, bootcamps.json, courses.json, reviews.json", default_value = "data")]
        dir: PathBuf,
    },

    #[command(about = "Delete all data")]
    Destroy,
}

pub async fn handle(cmd: SeedCommands) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let store = super::connect(&config).await?;

    match cmd {
        SeedCommands::Import { dir } => {
            let geocoder = MapQuestGeocoder::new(&config.geocoder)?;
            let summary = import(&store, &geocoder, &dir, config.security.bcrypt_cost).await?;
            println!(
                "Imported {} users, {} bootcamps, {} courses, {} reviews",
                summary.users, summary.bootcamps, summary.courses, summary.reviews
            );
        }
        SeedCommands::Destroy => {
            store.destroy_all().await?;
            println!("Data destroyed");
        }
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: String,
    name: String,
    email: String,
    #[serde(default)]
    role: Role,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedBootcamp {
    id: String,
    user: String,
    name: String,
    description: String,
    website: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    /// Pre-geocoded location; looked up from `address` when absent
    location: Option<Location>,
    #[serde(default)]
    careers: Vec<String>,
    #[serde(default)]
    housing: bool,
    #[serde(default)]
    job_assistance: bool,
    #[serde(default)]
    job_guarantee: bool,
    #[serde(default)]
    accept_gi: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedCourse {
    bootcamp: String,
    user: String,
    title: String,
    description: String,
    weeks: String,
    tuition: Decimal,
    minimum_skill: MinimumSkill,
    #[serde(default)]
    scholarship_available: bool,
}

#[derive(Debug, Deserialize)]
struct SeedReview {
    bootcamp: String,
    user: String,
    title: String,
    text: String,
    rating: i16,
}

/// Import every seed file found in `dir`; missing files are skipped
pub async fn import(
    store: &dyn Store,
    geocoder: &dyn Geocoder,
    dir: &Path,
    bcrypt_cost: u32,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let mut users: HashMap<String, Uuid> = HashMap::new();
    let mut bootcamps: HashMap<String, Uuid> = HashMap::new();

    for seed in read_records::<SeedUser>(dir, "users.json").await? {
        let password_hash = auth::hash_password(seed.password, bcrypt_cost).await?;
        let user = store
            .create_user(NewUser {
                name: seed.name,
                email: seed.email.to_lowercase(),
                role: seed.role,
                password_hash,
            })
            .await
            .with_context(|| format!("failed to import user {}", seed.id))?;
        users.insert(seed.id, user.id);
        summary.users += 1;
    }

    for seed in read_records::<SeedBootcamp>(dir, "bootcamps.json").await? {
        let owner = resolve(&users, "user", &seed.user)?;
        let location = match (seed.location, seed.address.as_deref()) {
            (Some(location), _) => Some(location),
            (None, Some(address)) => Some(Location::from(geocoder.geocode(address).await?)),
            (None, None) => None,
        };
        let bootcamp = store
            .create_bootcamp(NewBootcamp {
                user_id: owner,
                slug: slugify(&seed.name),
                name: seed.name,
                description: seed.description,
                website: seed.website,
                phone: seed.phone,
                email: seed.email,
                address: seed.address,
                location,
                careers: seed.careers,
                housing: seed.housing,
                job_assistance: seed.job_assistance,
                job_guarantee: seed.job_guarantee,
                accept_gi: seed.accept_gi,
            })
            .await
            .with_context(|| format!("failed to import bootcamp {}", seed.id))?;
        bootcamps.insert(seed.id, bootcamp.id);
        summary.bootcamps += 1;
    }

    for seed in read_records::<SeedCourse>(dir, "courses.json").await? {
        store
            .create_course(NewCourse {
                bootcamp_id: resolve(&bootcamps, "bootcamp", &seed.bootcamp)?,
                user_id: resolve(&users, "user", &seed.user)?,
                title: seed.title,
                description: seed.description,
                weeks: seed.weeks,
                tuition: seed.tuition,
                minimum_skill: seed.minimum_skill,
                scholarship_available: seed.scholarship_available,
            })
            .await?;
        summary.courses += 1;
    }

    for seed in read_records::<SeedReview>(dir, "reviews.json").await? {
        store
            .create_review(NewReview {
                bootcamp_id: resolve(&bootcamps, "bootcamp", &seed.bootcamp)?,
                user_id: resolve(&users, "user", &seed.user)?,
                title: seed.title,
                text: seed.text,
                rating: seed.rating,
            })
            .await?;
        summary.reviews += 1;
    }

    tracing::info!("Seed import from {} complete: {:?}", dir.display(), summary);
    Ok(summary)
}

fn resolve(ids: &HashMap<String, Uuid>, kind: &str, reference: &str) -> anyhow::Result<Uuid> {
    ids.get(reference)
        .copied()
        .ok_or_else(|| anyhow!("unknown {} reference {:?}", kind, reference))
}

async fn read_records<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(file);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        tracing::warn!("Seed file {} not found, skipping", path.display());
        return Ok(Vec::new());
    }
    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
