use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{ApiError, ApiResult},
    pins::handlers::load_pin,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/likes/pin/:pin_id/count", get(like_count))
        .route("/likes/pin/:pin_id/status", get(like_status))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/likes/pin/:pin_id", post(add_like).delete(remove_like))
}

#[instrument(skip(state))]
pub async fn add_like(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(pin_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_pin(&state, pin_id).await?;
    match state.store.add_like(&principal, pin_id).await? {
        Some(like) => {
            info!(like_id = %like.id, %pin_id, user_id = %principal.user_id, "pin liked");
            Ok(StatusCode::CREATED)
        }
        None => Err(ApiError::Conflict("Pin already liked".into())),
    }
}

/// Removes the caller's own like. The record still goes through the
/// guard like any other mutation.
#[instrument(skip(state))]
pub async fn remove_like(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(pin_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let like = state
        .store
        .like_by(pin_id, principal.user_id)
        .await?
        .ok_or(ApiError::NotFound("like"))?;
    let authorized = state.auth.authorize(&principal, like)?;
    state.store.delete_like(authorized).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn like_count(
    State(state): State<AppState>,
    Path(pin_id): Path<Uuid>,
) -> ApiResult<Json<i64>> {
    load_pin(&state, pin_id).await?;
    Ok(Json(state.store.count_likes(pin_id).await?))
}

#[instrument(skip(state, viewer))]
pub async fn like_status(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(pin_id): Path<Uuid>,
) -> ApiResult<Json<bool>> {
    let Some(viewer) = viewer else {
        return Ok(Json(false));
    };
    Ok(Json(state.store.like_by(pin_id, viewer.user_id).await?.is_some()))
}
