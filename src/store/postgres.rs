use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use super::Repositories;
use crate::{
    amenities::PgAmenities, bookings::PgBookings, config::AppConfig, hosts::PgHosts,
    properties::PgProperties, reviews::PgReviews, users::PgUsers,
};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    info!(max_connections = config.max_connections, "database pool open");
    Ok(db)
}

pub async fn migrate(db: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }
}

pub fn repositories(db: &PgPool) -> Repositories {
    Repositories {
        users: Arc::new(PgUsers::new(db.clone())),
        hosts: Arc::new(PgHosts::new(db.clone())),
        properties: Arc::new(PgProperties::new(db.clone())),
        bookings: Arc::new(PgBookings::new(db.clone())),
        reviews: Arc::new(PgReviews::new(db.clone())),
        amenities: Arc::new(PgAmenities::new(db.clone())),
    }
}
