use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{BoardResponse, CreateBoardRequest, UpdateBoardRequest},
    repo_types::{Board, BoardChanges, NewBoard},
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{ApiError, ApiResult},
    pins::{dto::PinResponse, handlers::pin_responses, repo_types::PinFilter},
    state::AppState,
};

const MAX_TITLE_LEN: usize = 200;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/boards", get(list_boards))
        .route("/boards/:id", get(get_board))
        .route("/boards/user/:user_id", get(list_user_boards))
        .route("/boards/:id/pins", get(list_board_pins))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/boards", post(create_board))
        .route("/boards/:id", put(update_board).delete(delete_board))
}

pub(crate) async fn load_board(state: &AppState, id: Uuid) -> ApiResult<Board> {
    state
        .store
        .board_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("board"))
}

async fn with_count(state: &AppState, board: Board) -> ApiResult<BoardResponse> {
    let pins = state.store.count_pins(board.id).await?;
    Ok(BoardResponse::new(board, pins))
}

async fn with_counts(state: &AppState, boards: Vec<Board>) -> ApiResult<Vec<BoardResponse>> {
    let mut out = Vec::with_capacity(boards.len());
    for b in boards {
        out.push(with_count(state, b).await?);
    }
    Ok(out)
}

fn check_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request("Title must be 1-200 characters"));
    }
    Ok(title.to_string())
}

#[instrument(skip(state))]
pub async fn list_boards(State(state): State<AppState>) -> ApiResult<Json<Vec<BoardResponse>>> {
    let boards = state.store.list_boards(None).await?;
    Ok(Json(with_counts(&state, boards).await?))
}

#[instrument(skip(state))]
pub async fn list_user_boards(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BoardResponse>>> {
    let boards = state.store.list_boards(Some(user_id)).await?;
    Ok(Json(with_counts(&state, boards).await?))
}

#[instrument(skip(state))]
pub async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardResponse>> {
    let board = load_board(&state, id).await?;
    Ok(Json(with_count(&state, board).await?))
}

#[instrument(skip(state, viewer))]
pub async fn list_board_pins(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<PinResponse>>> {
    load_board(&state, id).await?;
    let pins = state.store.list_pins(PinFilter::Board(id)).await?;
    Ok(Json(pin_responses(&state, pins, viewer.as_ref()).await?))
}

#[instrument(skip(state, body))]
pub async fn create_board(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<BoardResponse>)> {
    let new = NewBoard {
        title: check_title(&body.title)?,
        description: body.description,
        visibility: body.visibility.as_str().to_string(),
    };
    let board = state.store.create_board(&principal, new).await?;
    info!(board_id = %board.id, user_id = %principal.user_id, "board created");
    Ok((StatusCode::CREATED, Json(BoardResponse::new(board, 0))))
}

#[instrument(skip(state, body))]
pub async fn update_board(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBoardRequest>,
) -> ApiResult<Json<BoardResponse>> {
    let board = load_board(&state, id).await?;
    let authorized = state.auth.authorize(&principal, board)?;
    let changes = BoardChanges {
        title: body.title.as_deref().map(check_title).transpose()?,
        description: body.description,
        visibility: body.visibility.map(|v| v.as_str().to_string()),
    };
    let board = state.store.update_board(authorized, changes).await?;
    Ok(Json(with_count(&state, board).await?))
}

#[instrument(skip(state))]
pub async fn delete_board(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let board = load_board(&state, id).await?;
    let authorized = state.auth.authorize(&principal, board)?;
    state.store.delete_board(authorized).await?;
    info!(board_id = %id, user_id = %principal.user_id, "board deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(check_title("  Trips ").unwrap(), "Trips");
        assert!(check_title("   ").is_err());
        assert!(check_title(&"x".repeat(201)).is_err());
    }
}
