use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Hosts;
use crate::{
    error::{StoreError, StoreResult},
    store::Repository,
};

/// Host record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture_url: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug)]
pub struct NewHost {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture_url: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug, Default)]
pub struct HostPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub picture_url: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostFilter {
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub name: Option<String>,
}

impl NewHost {
    pub fn into_host(self, id: Uuid) -> Host {
        Host {
            id,
            username: self.username,
            password_hash: self.password_hash,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
            picture_url: self.picture_url,
            about_me: self.about_me,
        }
    }
}

impl Host {
    pub fn apply(&mut self, patch: HostPatch) {
        let HostPatch {
            username,
            password_hash,
            name,
            email,
            phone_number,
            picture_url,
            about_me,
        } = patch;
        self.username = username.unwrap_or(std::mem::take(&mut self.username));
        self.password_hash = password_hash.unwrap_or(std::mem::take(&mut self.password_hash));
        self.name = name.unwrap_or(std::mem::take(&mut self.name));
        self.email = email.unwrap_or(std::mem::take(&mut self.email));
        self.phone_number = phone_number.unwrap_or(std::mem::take(&mut self.phone_number));
        self.picture_url = picture_url.or(self.picture_url.take());
        self.about_me = about_me.or(self.about_me.take());
    }
}

impl HostFilter {
    pub fn matches(&self, host: &Host) -> bool {
        self.username.as_ref().map_or(true, |u| *u == host.username)
            && self.email.as_ref().map_or(true, |e| *e == host.email)
            && self.name.as_ref().map_or(true, |n| *n == host.name)
    }
}

const COLUMNS: &str =
    "id, username, password_hash, name, email, phone_number, picture_url, about_me";

pub struct PgHosts {
    db: PgPool,
}

impl PgHosts {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Hosts> for PgHosts {
    async fn list(&self, filter: &HostFilter) -> StoreResult<Vec<Host>> {
        let rows = sqlx::query_as::<_, Host>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM hosts
            WHERE ($1::text IS NULL OR username = $1)
              AND ($2::text IS NULL OR email = $2)
              AND ($3::text IS NULL OR name = $3)
            "#
        ))
        .bind(&filter.username)
        .bind(&filter.email)
        .bind(&filter.name)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Host>> {
        let row = sqlx::query_as::<_, Host>(&format!("SELECT {COLUMNS} FROM hosts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn create(&self, id: Uuid, new: NewHost) -> StoreResult<Host> {
        let host = sqlx::query_as::<_, Host>(&format!(
            r#"
            INSERT INTO hosts
                (id, username, password_hash, name, email, phone_number, picture_url, about_me)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
        .bind(&new.about_me)
        .fetch_one(&self.db)
        .await?;
        Ok(host)
    }

    async fn update(&self, id: Uuid, patch: HostPatch) -> StoreResult<Host> {
        sqlx::query_as::<_, Host>(&format!(
            r#"
            UPDATE hosts SET
                username      = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash),
                name          = COALESCE($4, name),
                email         = COALESCE($5, email),
                phone_number  = COALESCE($6, phone_number),
                picture_url   = COALESCE($7, picture_url),
                about_me      = COALESCE($8, about_me)
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
        .bind(&patch.about_me)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM hosts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
