pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use handlers::auth_routes as router;
