use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Bookings;
use crate::{
    error::{StoreError, StoreResult},
    store::Repository,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub checkin_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub checkout_date: OffsetDateTime,
    pub number_of_guests: i32,
    pub total_price: f64,
    pub booking_status: String,
}

#[derive(Debug)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub checkin_date: OffsetDateTime,
    pub checkout_date: OffsetDateTime,
    pub number_of_guests: i32,
    pub total_price: f64,
    pub booking_status: String,
}

#[derive(Debug, Default)]
pub struct BookingPatch {
    pub user_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    pub checkin_date: Option<OffsetDateTime>,
    pub checkout_date: Option<OffsetDateTime>,
    pub number_of_guests: Option<i32>,
    pub total_price: Option<f64>,
    pub booking_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookingFilter {
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::validate::blank_as_none")]
    pub property_id: Option<Uuid>,
}

impl NewBooking {
    pub fn into_booking(self, id: Uuid) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            property_id: self.property_id,
            checkin_date: self.checkin_date,
            checkout_date: self.checkout_date,
            number_of_guests: self.number_of_guests,
            total_price: self.total_price,
            booking_status: self.booking_status,
        }
    }
}

impl Booking {
    pub fn apply(&mut self, patch: BookingPatch) {
        if let Some(v) = patch.user_id {
            self.user_id = v;
        }
        if let Some(v) = patch.property_id {
            self.property_id = v;
        }
        if let Some(v) = patch.checkin_date {
            self.checkin_date = v;
        }
        if let Some(v) = patch.checkout_date {
            self.checkout_date = v;
        }
        if let Some(v) = patch.number_of_guests {
            self.number_of_guests = v;
        }
        if let Some(v) = patch.total_price {
            self.total_price = v;
        }
        if let Some(v) = patch.booking_status {
            self.booking_status = v;
        }
    }

    /// Mirrors the `bookings_dates_ordered` table constraint.
    pub fn dates_ordered(&self) -> bool {
        self.checkout_date > self.checkin_date
    }
}

impl BookingFilter {
    pub fn matches(&self, b: &Booking) -> bool {
        self.user_id.map_or(true, |u| u == b.user_id)
            && self.property_id.map_or(true, |p| p == b.property_id)
    }
}

const COLUMNS: &str = "id, user_id, property_id, checkin_date, checkout_date, \
                       number_of_guests, total_price, booking_status";

pub struct PgBookings {
    db: PgPool,
}

impl PgBookings {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Bookings> for PgBookings {
    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM bookings
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

    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, id: Uuid, new: NewBooking) -> StoreResult<Booking> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.user_id)
        .bind(new.property_id)
        .bind(new.checkin_date)
        .bind(new.checkout_date)
        .bind(new.number_of_guests)
        .bind(new.total_price)
        .bind(&new.booking_status)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: BookingPatch) -> StoreResult<Booking> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings SET
                user_id          = COALESCE($2, user_id),
                property_id      = COALESCE($3, property_id),
                checkin_date     = COALESCE($4, checkin_date),
                checkout_date    = COALESCE($5, checkout_date),
                number_of_guests = COALESCE($6, number_of_guests),
                total_price      = COALESCE($7, total_price),
                booking_status   = COALESCE($8, booking_status)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.user_id)
        .bind(patch.property_id)
        .bind(patch.checkin_date)
        .bind(patch.checkout_date)
        .bind(patch.number_of_guests)
        .bind(patch.total_price)
        .bind(&patch.booking_status)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
