use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Pin;

#[derive(Debug, Deserialize)]
pub struct CreatePinRequest {
    pub board_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePinRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PinResponse {
    pub id: Uuid,
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub like_count: i64,
    pub is_liked: bool, // always false for anonymous callers
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PinResponse {
    pub fn new(p: Pin, like_count: i64, is_liked: bool) -> Self {
        Self {
            id: p.id,
            board_id: p.board_id,
            user_id: p.user_id,
            title: p.title,
            description: p.description,
            image_url: p.image_url,
            like_count,
            is_liked,
            created_at: p.created_at,
        }
    }
}
