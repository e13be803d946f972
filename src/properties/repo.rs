use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Properties;
use crate::{
    error::{StoreError, StoreResult},
    store::Repository,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price_per_night: f64,
    pub bedroom_count: i32,
    pub bath_room_count: i32,
    pub max_guest_count: i32,
}

#[derive(Debug)]
pub struct NewProperty {
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price_per_night: f64,
    pub bedroom_count: i32,
    pub bath_room_count: i32,
    pub max_guest_count: i32,
}

#[derive(Debug, Default)]
pub struct PropertyPatch {
    pub host_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_night: Option<f64>,
    pub bedroom_count: Option<i32>,
    pub bath_room_count: Option<i32>,
    pub max_guest_count: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyFilter {
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub price_per_night: Option<f64>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub host_id: Option<Uuid>,
}

impl NewProperty {
    pub fn into_property(self, id: Uuid) -> Property {
        Property {
            id,
            host_id: self.host_id,
            title: self.title,
            description: self.description,
            location: self.location,
            price_per_night: self.price_per_night,
            bedroom_count: self.bedroom_count,
            bath_room_count: self.bath_room_count,
            max_guest_count: self.max_guest_count,
        }
    }
}

impl Property {
    pub fn apply(&mut self, patch: PropertyPatch) {
        if let Some(v) = patch.host_id {
            self.host_id = v;
        }
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.location {
            self.location = v;
        }
        if let Some(v) = patch.price_per_night {
            self.price_per_night = v;
        }
        if let Some(v) = patch.bedroom_count {
            self.bedroom_count = v;
        }
        if let Some(v) = patch.bath_room_count {
            self.bath_room_count = v;
        }
        if let Some(v) = patch.max_guest_count {
            self.max_guest_count = v;
        }
    }
}

impl PropertyFilter {
    pub fn matches(&self, p: &Property) -> bool {
        self.location.as_ref().map_or(true, |l| *l == p.location)
            && self.price_per_night.map_or(true, |v| v == p.price_per_night)
            && self.host_id.map_or(true, |h| h == p.host_id)
    }
}

const COLUMNS: &str = "id, host_id, title, description, location, price_per_night, \
                       bedroom_count, bath_room_count, max_guest_count";

pub struct PgProperties {
    db: PgPool,
}

impl PgProperties {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Properties> for PgProperties {
    async fn list(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        let rows = sqlx::query_as::<_, Property>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM properties
            WHERE ($1::text IS NULL OR location = $1)
              AND ($2::float8 IS NULL OR price_per_night = $2)
              AND ($3::uuid IS NULL OR host_id = $3)
            "#
        ))
        .bind(&filter.location)
        .bind(filter.price_per_night)
        .bind(filter.host_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Property>> {
        let row = sqlx::query_as::<_, Property>(&format!(
            "SELECT {COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, id: Uuid, new: NewProperty) -> StoreResult<Property> {
        let row = sqlx::query_as::<_, Property>(&format!(
            r#"
            INSERT INTO properties ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.host_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.price_per_night)
        .bind(new.bedroom_count)
        .bind(new.bath_room_count)
        .bind(new.max_guest_count)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: PropertyPatch) -> StoreResult<Property> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties SET
                host_id         = COALESCE($2, host_id),
                title           = COALESCE($3, title),
                description     = COALESCE($4, description),
                location        = COALESCE($5, location),
                price_per_night = COALESCE($6, price_per_night),
                bedroom_count   = COALESCE($7, bedroom_count),
                bath_room_count = COALESCE($8, bath_room_count),
                max_guest_count = COALESCE($9, max_guest_count)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.host_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.location)
        .bind(patch.price_per_night)
        .bind(patch.bedroom_count)
        .bind(patch.bath_room_count)
        .bind(patch.max_guest_count)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
