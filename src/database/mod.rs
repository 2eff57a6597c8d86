pub mod bootcamps;
pub mod courses;
pub mod models;
pub mod repository;
pub mod reviews;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::{FilterValue, SqlResult};

pub use repository::{BootcampStore, CourseStore, ReviewStore, Store, UserStore};

/// Errors from the resource store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("Duplicate value violates {0}")]
    Duplicate(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unique constraint").to_string();
                return StoreError::Duplicate(constraint);
            }
        }
        StoreError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

/// PostgreSQL-backed `Store`
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;
        info!("Connected to database (max {} connections)", config.max_connections);

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a generated SELECT and map every row through `R`
    pub(crate) async fn fetch_rows<R>(&self, sql: &SqlResult) -> Result<Vec<R>, StoreError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, R>(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    /// Run a generated `SELECT COUNT(*) as count`
    pub(crate) async fn fetch_count(&self, sql: &SqlResult) -> Result<u64, StoreError> {
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn destroy_all(&self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE reviews, courses, bootcamps, users")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        FilterValue::Text(s) => q.bind(s),
        FilterValue::Float(f) => q.bind(*f),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Timestamp(t) => q.bind(*t),
        FilterValue::Uuid(u) => q.bind(*u),
    }
}

pub(crate) fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q FilterValue,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        FilterValue::Text(s) => q.bind(s),
        FilterValue::Float(f) => q.bind(*f),
        FilterValue::Int(i) => q.bind(*i),
        FilterValue::Bool(b) => q.bind(*b),
        FilterValue::Timestamp(t) => q.bind(*t),
        FilterValue::Uuid(u) => q.bind(*u),
    }
}
