pub mod amenities;
pub mod app;
pub mod auth;
pub mod bookings;
pub mod config;
pub mod crud;
pub mod error;
pub mod extract;
pub mod hosts;
pub mod properties;
pub mod reviews;
pub mod seed;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod users;
pub mod validate;
