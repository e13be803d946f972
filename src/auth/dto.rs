use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::Role;

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub identity: PublicIdentity,
}

/// Public part of the identity returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicIdentity {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// What login needs from a stored user or host.
#[derive(Debug)]
pub struct Credentials {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}
