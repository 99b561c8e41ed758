use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreatePinRequest, PinResponse, UpdatePinRequest},
    repo_types::{NewPin, Pin, PinChanges, PinFilter},
};
use crate::{
    auth::{
        extractors::{AuthUser, MaybeAuthUser},
        principal::Principal,
    },
    boards::handlers::load_board,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/pins", get(list_pins))
        .route("/pins/:id", get(get_pin))
        .route("/pins/user/:user_id", get(list_user_pins))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/pins", post(create_pin))
        .route("/pins/:id", put(update_pin).delete(delete_pin))
}

pub(crate) async fn load_pin(state: &AppState, id: Uuid) -> ApiResult<Pin> {
    state
        .store
        .pin_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("pin"))
}

pub(crate) async fn pin_response(
    state: &AppState,
    pin: Pin,
    viewer: Option<&Principal>,
) -> ApiResult<PinResponse> {
    let likes = state.store.count_likes(pin.id).await?;
    let liked = match viewer {
        Some(p) => state.store.like_by(pin.id, p.user_id).await?.is_some(),
        None => false,
    };
    Ok(PinResponse::new(pin, likes, liked))
}

pub(crate) async fn pin_responses(
    state: &AppState,
    pins: Vec<Pin>,
    viewer: Option<&Principal>,
) -> ApiResult<Vec<PinResponse>> {
    let mut out = Vec::with_capacity(pins.len());
    for pin in pins {
        out.push(pin_response(state, pin, viewer).await?);
    }
    Ok(out)
}

fn non_empty(field: &'static str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

#[instrument(skip(state, viewer))]
pub async fn list_pins(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> ApiResult<Json<Vec<PinResponse>>> {
    let pins = state.store.list_pins(PinFilter::All).await?;
    Ok(Json(pin_responses(&state, pins, viewer.as_ref()).await?))
}

#[instrument(skip(state, viewer))]
pub async fn list_user_pins(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PinResponse>>> {
    let pins = state.store.list_pins(PinFilter::Owner(user_id)).await?;
    Ok(Json(pin_responses(&state, pins, viewer.as_ref()).await?))
}

#[instrument(skip(state, viewer))]
pub async fn get_pin(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PinResponse>> {
    let pin = load_pin(&state, id).await?;
    Ok(Json(pin_response(&state, pin, viewer.as_ref()).await?))
}

/// Pins go into a board, so the caller must own that board.
#[instrument(skip(state, body))]
pub async fn create_pin(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<CreatePinRequest>,
) -> ApiResult<(StatusCode, Json<PinResponse>)> {
    let new = NewPin {
        title: non_empty("title", &body.title)?,
        description: body.description,
        image_url: non_empty("image_url", &body.image_url)?,
    };
    let board = load_board(&state, body.board_id).await?;
    let board = state.auth.authorize(&principal, board)?;
    let pin = state.store.create_pin(&board, new).await?;
    info!(pin_id = %pin.id, board_id = %pin.board_id, "pin created");
    Ok((StatusCode::CREATED, Json(PinResponse::new(pin, 0, false))))
}

#[instrument(skip(state, body))]
pub async fn update_pin(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePinRequest>,
) -> ApiResult<Json<PinResponse>> {
    let pin = load_pin(&state, id).await?;
    let authorized = state.auth.authorize(&principal, pin)?;
    let changes = PinChanges {
        title: body.title.as_deref().map(|t| non_empty("title", t)).transpose()?,
        description: body.description,
        image_url: body
            .image_url
            .as_deref()
            .map(|u| non_empty("image_url", u))
            .transpose()?,
    };
    let pin = state.store.update_pin(authorized, changes).await?;
    Ok(Json(pin_response(&state, pin, Some(&principal)).await?))
}

#[instrument(skip(state))]
pub async fn delete_pin(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let pin = load_pin(&state, id).await?;
    let authorized = state.auth.authorize(&principal, pin)?;
    state.store.delete_pin(authorized).await?;
    info!(pin_id = %id, user_id = %principal.user_id, "pin deleted");
    Ok(StatusCode::NO_CONTENT)
}
