use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::guard::{OwnedResource, ResourceKind};

#[derive(Debug, Clone, FromRow)]
pub struct Board {
    pub id: Uuid,
    pub user_id: Uuid, // owner, never reassigned
    pub title: String,
    pub description: Option<String>,
    pub visibility: String, // "public" | "private"
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBoard {
    pub title: String,
    pub description: Option<String>,
    pub visibility: String,
}

#[derive(Debug, Clone, Default)]
pub struct BoardChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
}

impl OwnedResource for Board {
    const KIND: ResourceKind = ResourceKind::Board;

    fn owner_user_id(&self) -> Uuid {
        self.user_id
    }
}
