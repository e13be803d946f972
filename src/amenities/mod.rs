//! Amenities have no HTTP surface; the seeder is their only writer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{error::StoreResult, store::AmenityRepository};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Amenity {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug)]
pub struct NewAmenity {
    pub name: String,
}

pub struct PgAmenities {
    db: PgPool,
}

impl PgAmenities {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AmenityRepository for PgAmenities {
    async fn create(&self, id: Uuid, new: NewAmenity) -> StoreResult<Amenity> {
        let row = sqlx::query_as::<_, Amenity>(
            r#"
            INSERT INTO amenities (id, name)
            VALUES ($1, $2)
            RETURNING id, name
            "#,
        )
        .bind(id)
        .bind(&new.name)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }
}
