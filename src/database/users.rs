use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::models::{NewUser, User, UserChanges};
use super::repository::{not_found, BootcampStore, UserStore};
use super::{PgStore, StoreError};
use crate::filter::{Filter, ListQuery, Page};
use crate::types::Role;

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    password_hash: String,
    reset_password_token: Option<String>,
    reset_password_expire: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("user {}: {}", row.id, e)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            password_hash: row.password_hash,
            reset_password_token: row.reset_password_token,
            reset_password_expire: row.reset_password_expire,
            created_at: row.created_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> Result<Vec<User>, StoreError> {
    rows.into_iter().map(User::try_from).collect()
}

impl PgStore {
    async fn fetch_user(&self, sql: &str, bind: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(bind)
            .fetch_optional(self.pool())
            .await?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.fetch_user("SELECT * FROM users WHERE email = $1", email).await
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE reset_password_token = $1 AND reset_password_expire > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, StoreError> {
        let filter = Filter::new("users", query);
        let rows: Vec<UserRow> = self.fetch_rows(&filter.to_sql()).await?;
        let total = self.fetch_count(&filter.to_count_sql()).await?;
        Ok(Page {
            items: into_users(rows)?,
            total,
        })
    }

    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.role.as_str())
        .bind(&new.password_hash)
        .fetch_one(self.pool())
        .await?;
        User::try_from(row)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               email = COALESCE($3, email), \
               role = COALESCE($4, role) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.role.map(|r| r.as_str()))
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from)
            .transpose()?
            .ok_or_else(|| not_found("User", id))
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, reset_password_token = NULL, \
             reset_password_expire = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("User", id));
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<(String, DateTime<Utc>)>,
    ) -> Result<(), StoreError> {
        let (hash, expire) = token.unzip();
        let result = sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expire = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .bind(expire)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("User", id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        // Bootcamps of other owners whose aggregates include this user's rows
        let touched: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT c.bootcamp_id FROM courses c JOIN bootcamps b ON b.id = c.bootcamp_id \
               WHERE c.user_id = $1 AND b.user_id <> $1 \
             UNION \
             SELECT DISTINCT r.bootcamp_id FROM reviews r JOIN bootcamps b ON b.id = r.bootcamp_id \
               WHERE r.user_id = $1 AND b.user_id <> $1",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("User", id));
        }

        for bootcamp_id in touched {
            self.refresh_average_cost(bootcamp_id).await?;
            self.refresh_average_rating(bootcamp_id).await?;
        }
        Ok(())
    }
}
