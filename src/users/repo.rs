use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Users;
use crate::{
    error::{StoreError, StoreResult},
    store::Repository,
};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, not exposed in JSON
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture_url: Option<String>,
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture_url: Option<String>,
}

#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub picture_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserFilter {
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub email: Option<String>,
}

impl NewUser {
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            username: self.username,
            password_hash: self.password_hash,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
            picture_url: self.picture_url,
        }
    }
}

impl User {
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(v) = patch.username {
            self.username = v;
        }
        if let Some(v) = patch.password_hash {
            self.password_hash = v;
        }
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone_number {
            self.phone_number = v;
        }
        if patch.picture_url.is_some() {
            self.picture_url = patch.picture_url;
        }
    }
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.username.as_ref().map_or(true, |u| *u == user.username)
            && self.email.as_ref().map_or(true, |e| *e == user.email)
    }
}

const COLUMNS: &str = "id, username, password_hash, name, email, phone_number, picture_url";

pub struct PgUsers {
    db: PgPool,
}

impl PgUsers {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Users> for PgUsers {
    async fn list(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM users
            WHERE ($1::text IS NULL OR username = $1)
              AND ($2::text IS NULL OR email = $2)
            "#
        ))
        .bind(&filter.username)
        .bind(&filter.email)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn create(&self, id: Uuid, new: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, name, email, phone_number, picture_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone_number)
        .bind(&new.picture_url)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                username      = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash),
                name          = COALESCE($4, name),
                email         = COALESCE($5, email),
                phone_number  = COALESCE($6, phone_number),
                picture_url   = COALESCE($7, picture_url)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.username)
        .bind(&patch.password_hash)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone_number)
        .bind(&patch.picture_url)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
