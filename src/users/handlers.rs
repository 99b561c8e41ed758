use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::UpdateUserRequest;
use crate::{
    auth::{
        dto::PublicUser,
        extractors::AuthUser,
        repo_types::{AuthSubject, User, UserChanges},
        services::{check_new_password, is_valid_username},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/users/me", put(update_me).delete(delete_me))
}

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    state
        .store
        .user_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("user"))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PublicUser>> {
    Ok(Json(load_user(&state, id).await?.into()))
}

/// Renaming the account invalidates tokens issued under the old name,
/// since tokens carry the username as their subject.
#[instrument(skip(state, body))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    let user = load_user(&state, principal.user_id).await?;
    let mut changes = UserChanges {
        bio: body.bio,
        profile_picture: body.profile_picture,
        ..Default::default()
    };

    if let Some(username) = body.username.map(|u| u.trim().to_string()) {
        if username != user.username {
            if !is_valid_username(&username) {
                return Err(ApiError::bad_request("Invalid username"));
            }
            if state.users.find_by_username(&username).await?.is_some() {
                warn!(%username, "username already taken");
                return Err(ApiError::Conflict("Username already taken".into()));
            }
            changes.username = Some(username);
        }
    }

    if let Some(new_password) = body.new_password {
        let old_password = body.old_password.unwrap_or_default();
        if !state
            .auth
            .verify_password(old_password, user.password_hash_for_auth())
            .await
        {
            warn!(user_id = %user.id, "password change with wrong current password");
            return Err(ApiError::bad_request("Current password is incorrect"));
        }
        check_new_password(&new_password)?;
        changes.password_hash = Some(state.auth.hash_password(new_password).await?);
    }

    let authorized = state.auth.authorize(&principal, user)?;
    let user = state.store.update_user(authorized, changes).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<StatusCode> {
    let user = load_user(&state, principal.user_id).await?;
    let authorized = state.auth.authorize(&principal, user)?;
    state.store.delete_user(authorized).await?;
    info!(user_id = %principal.user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
