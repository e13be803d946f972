use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    crud::Controller,
    error::AppError,
    state::AppState,
    store::{Repository, Resource},
    validate::{self, at_least, Required},
};

mod dto;
mod repo;

pub use dto::{CreatePropertyRequest, UpdatePropertyRequest};
pub use repo::{NewProperty, PgProperties, Property, PropertyFilter, PropertyPatch};

pub struct Properties;

impl Resource for Properties {
    const NAME: &'static str = "Property";
    type Entity = Property;
    type New = NewProperty;
    type Patch = PropertyPatch;
    type Filter = PropertyFilter;
}

fn check_numbers(
    price_per_night: Option<f64>,
    bedroom_count: Option<i32>,
    bath_room_count: Option<i32>,
    max_guest_count: Option<i32>,
) -> Result<(), AppError> {
    if let Some(v) = price_per_night {
        if !v.is_finite() {
            return Err(AppError::InvalidInput("pricePerNight must be a number".into()));
        }
        at_least("pricePerNight", v, 0.0)?;
    }
    if let Some(v) = bedroom_count {
        at_least("bedroomCount", v, 0)?;
    }
    if let Some(v) = bath_room_count {
        at_least("bathRoomCount", v, 0)?;
    }
    if let Some(v) = max_guest_count {
        at_least("maxGuestCount", v, 1)?;
    }
    Ok(())
}

#[async_trait]
impl Controller for Properties {
    const PATH: &'static str = "/properties";

    type CreateBody = CreatePropertyRequest;
    type UpdateBody = UpdatePropertyRequest;

    fn repo(state: &AppState) -> &Arc<dyn Repository<Self>> {
        &state.repos.properties
    }

    fn id_of(property: &Property) -> Uuid {
        property.id
    }

    async fn prepare_create(body: CreatePropertyRequest) -> Result<NewProperty, AppError> {
        let mut required = Required::default();
        let title = required.text("title", body.title);
        let description = required.text("description", body.description);
        let location = required.text("location", body.location);
        let price_per_night = required.value("pricePerNight", body.price_per_night);
        let bedroom_count = required.value("bedroomCount", body.bedroom_count);
        let bath_room_count = required.value("bathRoomCount", body.bath_room_count);
        let max_guest_count = required.value("maxGuestCount", body.max_guest_count);
        let host_id = required.value("hostId", body.host_id);
        required.finish()?;
        check_numbers(
            Some(price_per_night),
            Some(bedroom_count),
            Some(bath_room_count),
            Some(max_guest_count),
        )?;

        Ok(NewProperty {
            host_id,
            title,
            description,
            location,
            price_per_night,
            bedroom_count,
            bath_room_count,
            max_guest_count,
        })
    }

    async fn prepare_update(body: UpdatePropertyRequest) -> Result<PropertyPatch, AppError> {
        check_numbers(
            body.price_per_night,
            body.bedroom_count,
            body.bath_room_count,
            body.max_guest_count,
        )?;

        Ok(PropertyPatch {
            host_id: body.host_id,
            title: validate::non_blank("title", body.title)?,
            description: validate::non_blank("description", body.description)?,
            location: validate::non_blank("location", body.location)?,
            price_per_night: body.price_per_night,
            bedroom_count: body.bedroom_count,
            bath_room_count: body.bath_room_count,
            max_guest_count: body.max_guest_count,
        })
    }
}
