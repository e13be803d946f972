//! Fixture loader: reads the JSON files under a seed directory and writes
//! them through the repositories in dependency order.

use std::path::Path;

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    amenities::NewAmenity,
    auth::password::hash_in_background,
    bookings::{NewBooking, STATUSES},
    hosts::NewHost,
    properties::NewProperty,
    reviews::NewReview,
    store::Repositories,
    users::NewUser,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedHost {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture_url: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProperty {
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub checkin_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub checkout_date: OffsetDateTime,
    pub number_of_guests: i32,
    pub total_price: f64,
    pub booking_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedAmenity {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub hosts: Vec<SeedHost>,
    pub properties: Vec<SeedProperty>,
    pub bookings: Vec<SeedBooking>,
    pub reviews: Vec<SeedReview>,
    pub amenities: Vec<SeedAmenity>,
}

/// Reads `<dir>/<key>.json`, shaped `{"<key>": [...]}`.
fn read_fixture<T: DeserializeOwned>(dir: &Path, key: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(format!("{key}.json"));
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))?;
    parse_fixture(&raw, key).with_context(|| format!("parse {}", path.display()))
}

fn parse_fixture<T: DeserializeOwned>(raw: &str, key: &str) -> anyhow::Result<Vec<T>> {
    let mut doc: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    let rows = doc
        .remove(key)
        .with_context(|| format!("missing top-level key {key:?}"))?;
    Ok(serde_json::from_value(rows)?)
}

impl SeedData {
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            users: read_fixture(dir, "users")?,
            hosts: read_fixture(dir, "hosts")?,
            properties: read_fixture(dir, "properties")?,
            bookings: read_fixture(dir, "bookings")?,
            reviews: read_fixture(dir, "reviews")?,
            amenities: read_fixture(dir, "amenities")?,
        })
    }
}

/// Inserts every fixture, parents first. Stops at the first failure.
pub async fn run(repos: &Repositories, data: SeedData) -> anyhow::Result<()> {
    info!(count = data.users.len(), "seeding users");
    for u in data.users {
        let new = NewUser {
            username: u.username,
            password_hash: hash_in_background(u.password).await?,
            name: u.name,
            email: u.email,
            phone_number: u.phone_number,
            picture_url: u.picture_url,
        };
        repos
            .users
            .create(u.id, new)
            .await
            .with_context(|| format!("seed user {}", u.id))?;
    }

    info!(count = data.hosts.len(), "seeding hosts");
    for h in data.hosts {
        let new = NewHost {
            username: h.username,
            password_hash: hash_in_background(h.password).await?,
            name: h.name,
            email: h.email,
            phone_number: h.phone_number,
            picture_url: h.picture_url,
            about_me: h.about_me,
        };
        repos
            .hosts
            .create(h.id, new)
            .await
            .with_context(|| format!("seed host {}", h.id))?;
    }

    info!(count = data.properties.len(), "seeding properties");
    for p in data.properties {
        let new = NewProperty {
            host_id: p.host_id,
            title: p.title,
            description: p.description,
            location: p.location,
            price_per_night: p.price_per_night,
            bedroom_count: p.bedroom_count,
            bath_room_count: p.bath_room_count,
            max_guest_count: p.max_guest_count,
        };
        repos
            .properties
            .create(p.id, new)
            .await
            .with_context(|| format!("seed property {}", p.id))?;
    }

    info!(count = data.bookings.len(), "seeding bookings");
    for b in data.bookings {
        let new = NewBooking {
            user_id: b.user_id,
            property_id: b.property_id,
            checkin_date: b.checkin_date,
            checkout_date: b.checkout_date,
            number_of_guests: b.number_of_guests,
            total_price: b.total_price,
            booking_status: b
                .booking_status
                .unwrap_or_else(|| STATUSES[0].to_string())
                .to_ascii_lowercase(),
        };
        repos
            .bookings
            .create(b.id, new)
            .await
            .with_context(|| format!("seed booking {}", b.id))?;
    }

    info!(count = data.reviews.len(), "seeding reviews");
    for r in data.reviews {
        let new = NewReview {
            user_id: r.user_id,
            property_id: r.property_id,
            rating: r.rating,
            comment: r.comment,
        };
        repos
            .reviews
            .create(r.id, new)
            .await
            .with_context(|| format!("seed review {}", r.id))?;
    }

    info!(count = data.amenities.len(), "seeding amenities");
    for a in data.amenities {
        repos
            .amenities
            .create(a.id, NewAmenity { name: a.name })
            .await
            .with_context(|| format!("seed amenity {}", a.id))?;
    }

    info!("database seeded");
    Ok(())
}
