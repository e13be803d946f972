//! In-process repository implementation with the same constraint semantics
//! as the Postgres schema: unique identities, foreign keys, check
//! constraints and cascading deletes. Every mutation validates and writes
//! under one lock, so concurrent writers cannot both pass a uniqueness check.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AmenityRepository, Repositories, Repository};
use crate::{
    amenities::{Amenity, NewAmenity},
    bookings::{Booking, BookingFilter, BookingPatch, Bookings, NewBooking, STATUSES},
    error::{StoreError, StoreResult},
    hosts::{Host, HostFilter, HostPatch, Hosts, NewHost},
    properties::{NewProperty, Properties, Property, PropertyFilter, PropertyPatch},
    reviews::{NewReview, Review, ReviewFilter, ReviewPatch, Reviews},
    users::{NewUser, User, UserFilter, UserPatch, Users},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    hosts: Vec<Host>,
    properties: Vec<Property>,
    bookings: Vec<Booking>,
    reviews: Vec<Review>,
    amenities: Vec<Amenity>,
}

impl Tables {
    fn user_unique(&self, candidate: &User) -> StoreResult<()> {
        let clash = self.users.iter().any(|u| {
            u.id != candidate.id && (u.username == candidate.username || u.email == candidate.email)
        });
        if clash {
            return Err(StoreError::UniqueViolation);
        }
        Ok(())
    }

    fn host_unique(&self, candidate: &Host) -> StoreResult<()> {
        let clash = self.hosts.iter().any(|h| {
            h.id != candidate.id && (h.username == candidate.username || h.email == candidate.email)
        });
        if clash {
            return Err(StoreError::UniqueViolation);
        }
        Ok(())
    }

    fn property_refs(&self, p: &Property) -> StoreResult<()> {
        if !self.hosts.iter().any(|h| h.id == p.host_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        if !(p.price_per_night >= 0.0
            && p.bedroom_count >= 0
            && p.bath_room_count >= 0
            && p.max_guest_count >= 1)
        {
            return Err(StoreError::CheckViolation);
        }
        Ok(())
    }

    fn booking_refs(&self, b: &Booking) -> StoreResult<()> {
        if !self.users.iter().any(|u| u.id == b.user_id)
            || !self.properties.iter().any(|p| p.id == b.property_id)
        {
            return Err(StoreError::ForeignKeyViolation);
        }
        if !b.dates_ordered()
            || b.number_of_guests < 1
            || !(b.total_price >= 0.0)
            || !STATUSES.contains(&b.booking_status.as_str())
        {
            return Err(StoreError::CheckViolation);
        }
        Ok(())
    }

    fn review_refs(&self, r: &Review) -> StoreResult<()> {
        if !self.users.iter().any(|u| u.id == r.user_id)
            || !self.properties.iter().any(|p| p.id == r.property_id)
        {
            return Err(StoreError::ForeignKeyViolation);
        }
        if !(1..=5).contains(&r.rating) {
            return Err(StoreError::CheckViolation);
        }
        Ok(())
    }

    fn drop_property_dependents(&mut self, property_ids: &[Uuid]) {
        self.bookings
            .retain(|b| !property_ids.contains(&b.property_id));
        self.reviews.retain(|r| !property_ids.contains(&r.property_id));
    }
}

fn position<T>(rows: &[T], id: Uuid, key: impl Fn(&T) -> Uuid) -> StoreResult<usize> {
    rows.iter()
        .position(|row| key(row) == id)
        .ok_or(StoreError::NotFound)
}

fn duplicate_id<T>(rows: &[T], id: Uuid, key: impl Fn(&T) -> Uuid) -> StoreResult<()> {
    if rows.iter().any(|row| key(row) == id) {
        return Err(StoreError::UniqueViolation);
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn amenities(&self) -> Vec<Amenity> {
        self.tables.read().await.amenities.clone()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.clone()),
            hosts: Arc::new(self.clone()),
            properties: Arc::new(self.clone()),
            bookings: Arc::new(self.clone()),
            reviews: Arc::new(self.clone()),
            amenities: Arc::new(self.clone()),
        }
    }
}

#[async_trait]
impl Repository<Users> for MemoryStore {
    async fn list(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, id: Uuid, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        let user = new.into_user(id);
        duplicate_id(&t.users, id, |u| u.id)?;
        t.user_unique(&user)?;
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        let idx = position(&t.users, id, |u| u.id)?;
        let mut user = t.users[idx].clone();
        user.apply(patch);
        t.user_unique(&user)?;
        t.users[idx] = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let idx = position(&t.users, id, |u| u.id)?;
        t.users.remove(idx);
        t.bookings.retain(|b| b.user_id != id);
        t.reviews.retain(|r| r.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl Repository<Hosts> for MemoryStore {
    async fn list(&self, filter: &HostFilter) -> StoreResult<Vec<Host>> {
        let t = self.tables.read().await;
        Ok(t.hosts.iter().filter(|h| filter.matches(h)).cloned().collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Host>> {
        let t = self.tables.read().await;
        Ok(t.hosts.iter().find(|h| h.id == id).cloned())
    }

    async fn create(&self, id: Uuid, new: NewHost) -> StoreResult<Host> {
        let mut t = self.tables.write().await;
        let host = new.into_host(id);
        duplicate_id(&t.hosts, id, |h| h.id)?;
        t.host_unique(&host)?;
        t.hosts.push(host.clone());
        Ok(host)
    }

    async fn update(&self, id: Uuid, patch: HostPatch) -> StoreResult<Host> {
        let mut t = self.tables.write().await;
        let idx = position(&t.hosts, id, |h| h.id)?;
        let mut host = t.hosts[idx].clone();
        host.apply(patch);
        t.host_unique(&host)?;
        t.hosts[idx] = host.clone();
        Ok(host)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let idx = position(&t.hosts, id, |h| h.id)?;
        t.hosts.remove(idx);
        let owned: Vec<Uuid> = t
            .properties
            .iter()
            .filter(|p| p.host_id == id)
            .map(|p| p.id)
            .collect();
        t.properties.retain(|p| p.host_id != id);
        t.drop_property_dependents(&owned);
        Ok(())
    }
}

#[async_trait]
impl Repository<Properties> for MemoryStore {
    async fn list(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        let t = self.tables.read().await;
        Ok(t.properties.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Property>> {
        let t = self.tables.read().await;
        Ok(t.properties.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, id: Uuid, new: NewProperty) -> StoreResult<Property> {
        let mut t = self.tables.write().await;
        let property = new.into_property(id);
        duplicate_id(&t.properties, id, |p| p.id)?;
        t.property_refs(&property)?;
        t.properties.push(property.clone());
        Ok(property)
    }

    async fn update(&self, id: Uuid, patch: PropertyPatch) -> StoreResult<Property> {
        let mut t = self.tables.write().await;
        let idx = position(&t.properties, id, |p| p.id)?;
        let mut property = t.properties[idx].clone();
        property.apply(patch);
        t.property_refs(&property)?;
        t.properties[idx] = property.clone();
        Ok(property)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let idx = position(&t.properties, id, |p| p.id)?;
        t.properties.remove(idx);
        t.drop_property_dependents(&[id]);
        Ok(())
    }
}

#[async_trait]
impl Repository<Bookings> for MemoryStore {
    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let t = self.tables.read().await;
        Ok(t.bookings.iter().filter(|b| filter.matches(b)).cloned().collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let t = self.tables.read().await;
        Ok(t.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn create(&self, id: Uuid, new: NewBooking) -> StoreResult<Booking> {
        let mut t = self.tables.write().await;
        let booking = new.into_booking(id);
        duplicate_id(&t.bookings, id, |b| b.id)?;
        t.booking_refs(&booking)?;
        t.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn update(&self, id: Uuid, patch: BookingPatch) -> StoreResult<Booking> {
        let mut t = self.tables.write().await;
        let idx = position(&t.bookings, id, |b| b.id)?;
        let mut booking = t.bookings[idx].clone();
        booking.apply(patch);
        t.booking_refs(&booking)?;
        t.bookings[idx] = booking.clone();
        Ok(booking)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let idx = position(&t.bookings, id, |b| b.id)?;
        t.bookings.remove(idx);
        Ok(())
    }
}

#[async_trait]
impl Repository<Reviews> for MemoryStore {
    async fn list(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        let t = self.tables.read().await;
        Ok(t.reviews.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Review>> {
        let t = self.tables.read().await;
        Ok(t.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, id: Uuid, new: NewReview) -> StoreResult<Review> {
        let mut t = self.tables.write().await;
        let review = new.into_review(id);
        duplicate_id(&t.reviews, id, |r| r.id)?;
        t.review_refs(&review)?;
        t.reviews.push(review.clone());
        Ok(review)
    }

    async fn update(&self, id: Uuid, patch: ReviewPatch) -> StoreResult<Review> {
        let mut t = self.tables.write().await;
        let idx = position(&t.reviews, id, |r| r.id)?;
        let mut review = t.reviews[idx].clone();
        review.apply(patch);
        t.review_refs(&review)?;
        t.reviews[idx] = review.clone();
        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let idx = position(&t.reviews, id, |r| r.id)?;
        t.reviews.remove(idx);
        Ok(())
    }
}

#[async_trait]
impl AmenityRepository for MemoryStore {
    async fn create(&self, id: Uuid, new: NewAmenity) -> StoreResult<Amenity> {
        let mut t = self.tables.write().await;
        if t.amenities.iter().any(|a| a.id == id || a.name == new.name) {
            return Err(StoreError::UniqueViolation);
        }
        let amenity = Amenity { id, name: new.name };
        t.amenities.push(amenity.clone());
        Ok(amenity)
    }
}
