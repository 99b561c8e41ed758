use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CommentResponse, CreateCommentRequest, UpdateCommentRequest},
    repo_types::Comment,
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    pins::handlers::load_pin,
    state::AppState,
};

const MAX_COMMENT_LEN: usize = 2000;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/comments/pin/:pin_id", get(list_pin_comments))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/:id", put(update_comment).delete(delete_comment))
}

fn check_text(text: &str) -> ApiResult<String> {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::bad_request("Comment must be 1-2000 characters"));
    }
    Ok(text.to_string())
}

async fn load_comment(state: &AppState, id: Uuid) -> ApiResult<Comment> {
    state
        .store
        .comment_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("comment"))
}

#[instrument(skip(state))]
pub async fn list_pin_comments(
    State(state): State<AppState>,
    Path(pin_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    load_pin(&state, pin_id).await?;
    let rows = state.store.comments_for_pin(pin_id).await?;
    Ok(Json(rows.into_iter().map(CommentResponse::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let text = check_text(&body.text)?;
    load_pin(&state, body.pin_id).await?;
    let comment = state
        .store
        .create_comment(&principal, body.pin_id, text)
        .await?;
    info!(comment_id = %comment.id, pin_id = %comment.pin_id, "comment added");
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(comment, principal.username)),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    let text = check_text(&body.text)?;
    let comment = load_comment(&state, id).await?;
    let authorized = state.auth.authorize(&principal, comment)?;
    let comment = state.store.update_comment(authorized, text).await?;
    Ok(Json(CommentResponse::new(comment, principal.username)))
}

/// Only the author may delete; owning the pin or board is not enough.
#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let comment = load_comment(&state, id).await?;
    let authorized = state.auth.authorize(&principal, comment)?;
    state.store.delete_comment(authorized).await?;
    info!(comment_id = %id, user_id = %principal.user_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_bounds() {
        assert_eq!(check_text(" nice pin ").unwrap(), "nice pin");
        assert!(check_text("\n\t ").is_err());
        assert!(check_text(&"a".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
