use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::Reviews;
use crate::{
    error::{StoreError, StoreResult},
    store::Repository,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug)]
pub struct NewReview {
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

/// Only the verdict is editable; a review never moves between users or
/// properties.
#[derive(Debug, Default)]
pub struct ReviewPatch {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewFilter {
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub property_id: Option<Uuid>,
}

impl NewReview {
    pub fn into_review(self, id: Uuid) -> Review {
        Review {
            id,
            user_id: self.user_id,
            property_id: self.property_id,
            rating: self.rating,
            comment: self.comment,
        }
    }
}

impl Review {
    pub fn apply(&mut self, patch: ReviewPatch) {
        if let Some(v) = patch.rating {
            self.rating = v;
        }
        if let Some(v) = patch.comment {
            self.comment = v;
        }
    }
}

impl ReviewFilter {
    pub fn matches(&self, r: &Review) -> bool {
        self.user_id.map_or(true, |u| u == r.user_id)
            && self.property_id.map_or(true, |p| p == r.property_id)
    }
}

const COLUMNS: &str = "id, user_id, property_id, rating, comment";

pub struct PgReviews {
    db: PgPool,
}

impl PgReviews {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Reviews> for PgReviews {
    async fn list(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM reviews
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR property_id = $2)
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.property_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Review>> {
        let row = sqlx::query_as::<_, Review>(&format!("SELECT {COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn create(&self, id: Uuid, new: NewReview) -> StoreResult<Review> {
        let row = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.user_id)
        .bind(new.property_id)
        .bind(new.rating)
        .bind(&new.comment)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: ReviewPatch) -> StoreResult<Review> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews SET
                rating  = COALESCE($2, rating),
                comment = COALESCE($3, comment)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.rating)
        .bind(&patch.comment)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
