use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Dates are RFC 3339 timestamps, e.g. `2024-03-01T15:00:00Z`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBookingRequest {
    pub user_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub checkin_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub checkout_date: Option<OffsetDateTime>,
    pub number_of_guests: Option<i32>,
    pub total_price: Option<f64>,
    pub booking_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBookingRequest {
    pub user_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub checkin_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub checkout_date: Option<OffsetDateTime>,
    pub number_of_guests: Option<i32>,
    pub total_price: Option<f64>,
    pub booking_status: Option<String>,
}
