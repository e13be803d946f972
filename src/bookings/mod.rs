use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    crud::{self, Controller},
    error::AppError,
    state::AppState,
    store::{Repository, Resource},
    validate::{at_least, Required},
};

mod dto;
mod repo;

pub use dto::{CreateBookingRequest, UpdateBookingRequest};
pub use repo::{Booking, BookingFilter, BookingPatch, NewBooking, PgBookings};

pub const STATUSES: [&str; 3] = ["pending", "confirmed", "canceled"];

pub struct Bookings;

impl Resource for Bookings {
    const NAME: &'static str = "Booking";
    type Entity = Booking;
    type New = NewBooking;
    type Patch = BookingPatch;
    type Filter = BookingFilter;
}

fn status(raw: String) -> Result<String, AppError> {
    let s = raw.trim().to_ascii_lowercase();
    if STATUSES.contains(&s.as_str()) {
        Ok(s)
    } else {
        Err(AppError::InvalidInput(format!(
            "bookingStatus must be one of: {}",
            STATUSES.join(", ")
        )))
    }
}

fn check_numbers(number_of_guests: Option<i32>, total_price: Option<f64>) -> Result<(), AppError> {
    if let Some(n) = number_of_guests {
        at_least("numberOfGuests", n, 1)?;
    }
    if let Some(p) = total_price {
        if !p.is_finite() {
            return Err(AppError::InvalidInput("totalPrice must be a number".into()));
        }
        at_least("totalPrice", p, 0.0)?;
    }
    Ok(())
}

fn check_dates(checkin: OffsetDateTime, checkout: OffsetDateTime) -> Result<(), AppError> {
    if checkout <= checkin {
        return Err(AppError::InvalidInput(
            "checkoutDate must be after checkinDate".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Controller for Bookings {
    const PATH: &'static str = "/bookings";

    type CreateBody = CreateBookingRequest;
    type UpdateBody = UpdateBookingRequest;

    fn repo(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.repos.bookings
    }

    fn id_of(booking: &Booking) -> Uuid {
        booking.id
    }

    async fn prepare_create(body: CreateBookingRequest) -> Result<NewBooking, AppError> {
        let mut required = Required::default();
        let user_id = required.value("userId", body.user_id);
        let property_id = required.value("propertyId", body.property_id);
        let checkin_date =
            required.value_or("checkinDate", body.checkin_date, OffsetDateTime::UNIX_EPOCH);
        let checkout_date =
            required.value_or("checkoutDate", body.checkout_date, OffsetDateTime::UNIX_EPOCH);
        let number_of_guests = required.value("numberOfGuests", body.number_of_guests);
        let total_price = required.value("totalPrice", body.total_price);
        required.finish()?;

        check_dates(checkin_date, checkout_date)?;
        check_numbers(Some(number_of_guests), Some(total_price))?;
        let booking_status = match body.booking_status {
            Some(s) => status(s)?,
            None => STATUSES[0].to_string(),
        };

        Ok(NewBooking {
            user_id,
            property_id,
            checkin_date,
            checkout_date,
            number_of_guests,
            total_price,
            booking_status,
        })
    }

    /// Date order against the stored row is left to the table constraint;
    /// only a pair supplied together is checked here.
    async fn prepare_update(body: UpdateBookingRequest) -> Result<BookingPatch, AppError> {
        if let (Some(checkin), Some(checkout)) = (body.checkin_date, body.checkout_date) {
            check_dates(checkin, checkout)?;
        }
        check_numbers(body.number_of_guests, body.total_price)?;

        Ok(BookingPatch {
            user_id: body.user_id,
            property_id: body.property_id,
            checkin_date: body.checkin_date,
            checkout_date: body.checkout_date,
            number_of_guests: body.number_of_guests,
            total_price: body.total_price,
            booking_status: body.booking_status.map(status).transpose()?,
        })
    }
}

pub fn routes(state: &AppState) -> Router<AppState> {
    crud::routes::<Bookings>(state).route(
        "/bookings/user/:user_id",
        crud::gated(get(list_for_user), state),
    )
}

#[instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    // An id that is not a UUID owns no bookings.
    let Ok(user_id) = Uuid::parse_str(&user_id) else {
        return Ok(Json(Vec::new()));
    };
    let filter = BookingFilter {
        user_id: Some(user_id),
        ..Default::default()
    };
    let rows = state
        .repos
        .bookings
        .list(&filter)
        .await
        .map_err(|e| AppError::from_store(e, Bookings::NAME, Bookings::CONFLICT))?;
    Ok(Json(rows))
}
