//! Repository interface between controllers and the storage engine.
//!
//! Constraint enforcement (uniqueness, references, field checks) belongs to
//! the implementation behind these traits; callers never check-then-act.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::{
    amenities::{Amenity, NewAmenity},
    bookings::Bookings,
    error::StoreResult,
    hosts::Hosts,
    properties::Properties,
    reviews::Reviews,
    users::Users,
};

pub mod memory;
pub mod postgres;

/// Type-level description of one stored entity.
pub trait Resource: Send + Sync + 'static {
    /// Display name, e.g. `"Property"`.
    const NAME: &'static str;

    type Entity: Serialize + Clone + Send + Sync + 'static;
    /// Validated field set for an insert.
    type New: Send + 'static;
    /// Validated field set for a partial update; `None` leaves a column as is.
    type Patch: Send + 'static;
    /// Equality filters accepted by `list`, parsed from the query string.
    type Filter: DeserializeOwned + Default + Send + Sync + 'static;
}

#[async_trait]
pub trait Repository<R: Resource>: Send + Sync {
    async fn list(&self, filter: &R::Filter) -> StoreResult<Vec<R::Entity>>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<R::Entity>>;

    async fn create(&self, id: Uuid, new: R::New) -> StoreResult<R::Entity>;

    /// Fails with `StoreError::NotFound` when no row has `id`.
    async fn update(&self, id: Uuid, patch: R::Patch) -> StoreResult<R::Entity>;

    /// Fails with `StoreError::NotFound` when no row has `id`.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Amenities are only ever written by the seeder.
#[async_trait]
pub trait AmenityRepository: Send + Sync {
    async fn create(&self, id: Uuid, new: NewAmenity) -> StoreResult<Amenity>;
}

/// Handles to every repository, shared by all handlers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn Repository<Users>>,
    pub hosts: Arc<dyn Repository<Hosts>>,
    pub properties: Arc<dyn Repository<Properties>>,
    pub bookings: Arc<dyn Repository<Bookings>>,
    pub reviews: Arc<dyn Repository<Reviews>>,
    pub amenities: Arc<dyn AmenityRepository>,
}
