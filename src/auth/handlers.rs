use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest},
        extractors::AuthUser,
        principal::Principal,
        repo_types::NewUser,
        services::{check_new_password, is_valid_email, is_valid_username, normalize},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (username, email) = normalize(&payload.username, &payload.email);

    if !is_valid_username(&username) {
        warn!(%username, "invalid username");
        return Err(ApiError::bad_request("Invalid username"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }
    check_new_password(&payload.password)?;

    if state.users.find_by_username(&username).await?.is_some() {
        warn!(%username, "username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = state.auth.hash_password(payload.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            username,
            email,
            password_hash,
            bio: payload.bio,
            profile_picture: payload.profile_picture,
        })
        .await?;

    let session = state.auth.start_session(Principal::from(&user))?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(session, user.into())),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let session = state
        .auth
        .login(payload.username.trim(), &payload.password)
        .await?;
    let user = state
        .store
        .user_by_id(session.principal.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(AuthResponse::new(session, user.into())))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = state
        .store
        .user_by_id(principal.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user.into()))
}
