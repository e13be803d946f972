//! Generic list/get/create/update/delete handlers shared by every resource.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{Path, State},
    http::{header::LOCATION, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app::route_not_found,
    auth::middleware::{authorize, AuthUser},
    error::{AppError, StoreError},
    extract::{JsonBody, QueryParams},
    state::AppState,
    store::{Repository, Resource},
};

/// Binds a [`Resource`] to its HTTP surface and request schemas.
#[async_trait]
pub trait Controller: Resource + Sized {
    /// Collection path, e.g. `"/properties"`.
    const PATH: &'static str;
    /// Message for uniqueness violations.
    const CONFLICT: &'static str = "Record already exists";

    type CreateBody: DeserializeOwned + Send + 'static;
    type UpdateBody: DeserializeOwned + Send + 'static;

    fn repo(state: &AppState) -> &Arc<dyn Repository<Self>>;

    fn id_of(entity: &Self::Entity) -> Uuid;

    /// Validates a create body. Secrets are hashed here, before any write.
    async fn prepare_create(body: Self::CreateBody) -> Result<Self::New, AppError>;

    async fn prepare_update(body: Self::UpdateBody) -> Result<Self::Patch, AppError>;
}

/// Puts the authorization gate on the routed methods of a path. Methods with
/// no handler fall through to the JSON 404 without passing the gate.
pub fn gated(methods: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    methods
        .route_layer(from_fn_with_state(state.clone(), authorize))
        .fallback(route_not_found)
}

pub fn routes<C: Controller>(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(C::PATH, gated(get(list::<C>).post(create::<C>), state))
        .route(
            &format!("{}/:id", C::PATH),
            gated(get(fetch::<C>).put(update::<C>).delete(remove::<C>), state),
        )
}

fn store_error<C: Controller>(err: StoreError) -> AppError {
    AppError::from_store(err, C::NAME, C::CONFLICT)
}

fn not_found<C: Controller>() -> AppError {
    AppError::NotFound(format!("{} not found", C::NAME))
}

/// Ids that are not UUIDs cannot name a stored row.
fn parse_id<C: Controller>(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| not_found::<C>())
}

#[instrument(skip_all, fields(resource = C::NAME))]
pub async fn list<C: Controller>(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<C::Filter>,
) -> Result<Json<Vec<C::Entity>>, AppError> {
    let rows = C::repo(&state)
        .list(&filter)
        .await
        .map_err(store_error::<C>)?;
    Ok(Json(rows))
}

#[instrument(skip(state), fields(resource = C::NAME))]
pub async fn fetch<C: Controller>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<C::Entity>, AppError> {
    let id = parse_id::<C>(&id)?;
    C::repo(&state)
        .get(id)
        .await
        .map_err(store_error::<C>)?
        .map(Json)
        .ok_or_else(not_found::<C>)
}

#[instrument(skip_all, fields(resource = C::NAME))]
pub async fn create<C: Controller>(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    JsonBody(body): JsonBody<C::CreateBody>,
) -> Result<impl IntoResponse, AppError> {
    let new = C::prepare_create(body).await?;
    let id = Uuid::new_v4();
    let created = C::repo(&state)
        .create(id, new)
        .await
        .map_err(store_error::<C>)?;

    info!(%id, actor = ?caller.map(|c| c.0.sub), "created");
    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("{}/{}", C::PATH, C::id_of(&created)))],
        Json(created),
    ))
}

#[instrument(skip(state, caller, body), fields(resource = C::NAME))]
pub async fn update<C: Controller>(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<C::UpdateBody>,
) -> Result<Json<C::Entity>, AppError> {
    let id = parse_id::<C>(&id)?;
    let patch = C::prepare_update(body).await?;
    let updated = C::repo(&state)
        .update(id, patch)
        .await
        .map_err(store_error::<C>)?;

    info!(%id, actor = ?caller.map(|c| c.0.sub), "updated");
    Ok(Json(updated))
}

#[instrument(skip(state, caller), fields(resource = C::NAME))]
pub async fn remove<C: Controller>(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id::<C>(&id)?;
    C::repo(&state)
        .delete(id)
        .await
        .map_err(store_error::<C>)?;

    info!(%id, actor = ?caller.map(|c| c.0.sub), "deleted");
    Ok(Json(json!({ "message": format!("{} deleted", C::NAME) })))
}
