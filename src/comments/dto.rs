use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Comment, CommentWithAuthor};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub pin_id: Uuid,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl CommentResponse {
    pub fn new(c: Comment, username: String) -> Self {
        Self {
            id: c.id,
            pin_id: c.pin_id,
            user_id: c.user_id,
            username,
            text: c.text,
            created_at: c.created_at,
        }
    }
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(row: CommentWithAuthor) -> Self {
        Self::new(row.comment, row.username)
    }
}
