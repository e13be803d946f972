use axum::{extract::State, routing::post, Json, Router};
use tracing::{error, info, instrument, warn};

use crate::{
    app::route_not_found,
    auth::{
        dto::{AuthResponse, Credentials, LoginRequest, PublicIdentity},
        jwt::Role,
        password::{reject_unknown_account, verify_in_background},
    },
    error::AppError,
    extract::JsonBody,
    hosts::HostFilter,
    state::AppState,
    users::UserFilter,
    validate::Required,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login).fallback(route_not_found))
}

async fn find_credentials(
    state: &AppState,
    role: Role,
    username: &str,
) -> Result<Option<Credentials>, AppError> {
    let found = match role {
        Role::User => {
            let filter = UserFilter {
                username: Some(username.to_string()),
                ..Default::default()
            };
            state
                .repos
                .users
                .list(&filter)
                .await
                .map_err(|e| AppError::from_store(e, "User", "User already exists"))?
                .into_iter()
                .next()
                .map(Credentials::from)
        }
        Role::Host => {
            let filter = HostFilter {
                username: Some(username.to_string()),
                ..Default::default()
            };
            state
                .repos
                .hosts
                .list(&filter)
                .await
                .map_err(|e| AppError::from_store(e, "Host", "Host already exists"))?
                .into_iter()
                .next()
                .map(Credentials::from)
        }
    };
    Ok(found)
}

#[instrument(skip(state, payload), fields(role = ?payload.role))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let mut required = Required::default();
    let username = required.text("username", payload.username);
    let password = required.secret("password", payload.password);
    required.finish()?;

    let Some(creds) = find_credentials(&state, payload.role, &username).await? else {
        reject_unknown_account(password).await;
        warn!(%username, "login unknown username");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    let ok = verify_in_background(password, creds.password_hash)
        .await
        .map_err(|e| {
            error!(error = %e, "verify_password failed");
            AppError::Internal(e)
        })?;
    if !ok {
        warn!(%username, id = %creds.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = state.keys.issue(creds.id, &creds.username, payload.role)?;

    info!(id = %creds.id, %username, "identity logged in");
    Ok(Json(AuthResponse {
        token,
        identity: PublicIdentity {
            id: creds.id,
            username: creds.username,
            role: payload.role,
        },
    }))
}
